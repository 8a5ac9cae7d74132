// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{FromRow, query, query_as};

use crate::cbor::{decode_cbor, encode_cbor};
use crate::document::{Document, DocumentId};
use crate::documents::DocumentStore;
use crate::sqlite::{SqliteError, SqliteStore};
use crate::timestamp::NodeId;

impl<'a, M> DocumentStore<M> for SqliteStore<'a>
where
    M: Serialize + DeserializeOwned,
{
    type Error = SqliteError;

    async fn insert_document(&self, document: &Document<M>) -> Result<(), Self::Error> {
        self.tx(async |tx| {
            query(
                "
                INSERT
                INTO
                    documents_v1 (
                        id,
                        node_id,
                        meta
                    )
                VALUES
                    (?, ?, ?)
                ",
            )
            .bind(document.id.to_string())
            .bind(document.node_id.to_string())
            .bind(
                encode_cbor(&document.meta)
                    .map_err(|err| SqliteError::Encode("meta".to_string(), err))?,
            )
            .execute(&mut **tx)
            .await
            .map_err(|err| match err {
                // Re-registering a taken document id is a domain error, not a database fault.
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    SqliteError::DocumentExists(document.id.clone())
                }
                err => SqliteError::Sqlite(err),
            })?;
            Ok(())
        })
        .await
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Document<M>, Self::Error> {
        let result = self
            .execute(async |pool| {
                query_as::<_, DocumentRow>(
                    "
                    SELECT
                        id,
                        node_id,
                        meta
                    FROM
                        documents_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id.to_string())
                .fetch_optional(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        match result {
            Some(row) => Ok(row.try_into()?),
            None => Err(SqliteError::DocumentMissing(id.clone())),
        }
    }

    async fn get_documents(&self) -> Result<Vec<Document<M>>, Self::Error> {
        let rows = self
            .execute(async |pool| {
                query_as::<_, DocumentRow>(
                    "
                    SELECT
                        id,
                        node_id,
                        meta
                    FROM
                        documents_v1
                    ",
                )
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(DocumentRow::try_into).collect()
    }

    async fn set_metadata(&self, id: &DocumentId, meta: &M) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    UPDATE
                        documents_v1
                    SET
                        meta = ?
                    WHERE
                        id = ?
                    ",
                )
                .bind(
                    encode_cbor(meta)
                        .map_err(|err| SqliteError::Encode("meta".to_string(), err))?,
                )
                .bind(id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Single document row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    node_id: String,
    meta: Vec<u8>,
}

impl<M> TryFrom<DocumentRow> for Document<M>
where
    M: DeserializeOwned,
{
    type Error = SqliteError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: DocumentId::new(row.id),
            node_id: NodeId::new(row.node_id),
            meta: decode_cbor(&row.meta[..])
                .map_err(|err| SqliteError::Decode("meta".into(), err.into()))?,
        })
    }
}
