// SPDX-License-Identifier: MIT OR Apache-2.0

use futures_util::TryStreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{FromRow, query, query_as};

use crate::cbor::{decode_cbor, encode_cbor};
use crate::document::DocumentId;
use crate::fragment::Fragment;
use crate::fragments::FragmentStore;
use crate::sqlite::{SqliteError, SqliteStore};
use crate::timestamp::{NodeId, Timestamp};

impl<'a, V> FragmentStore<V> for SqliteStore<'a>
where
    V: Serialize + DeserializeOwned,
{
    type Error = SqliteError;

    async fn insert_fragments(&self, fragments: &[Fragment<V>]) -> Result<u64, Self::Error> {
        self.tx(async |tx| {
            let mut inserted = 0;

            for fragment in fragments {
                // Ignore insertion when the (timestamp, document_id) key already exists (PRIMARY
                // KEY constraint), the same fragment may be replayed via different sync paths.
                let result = query(
                    "
                    INSERT OR IGNORE
                    INTO
                        fragments_v1 (
                            document_id,
                            timestamp,
                            node_id,
                            table_name,
                            row_name,
                            column_name,
                            value
                        )
                    VALUES
                        (?, ?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(fragment.document_id.to_string())
                .bind(fragment.timestamp.to_string())
                .bind(fragment.timestamp.node_id().to_string())
                .bind(&fragment.table)
                .bind(&fragment.row)
                .bind(&fragment.column)
                .bind(
                    encode_cbor(&fragment.value)
                        .map_err(|err| SqliteError::Encode("value".to_string(), err))?,
                )
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)?;

                inserted += result.rows_affected();
            }

            Ok(inserted)
        })
        .await
    }

    async fn get_fragments_since(
        &self,
        document_id: &DocumentId,
        since: &Timestamp,
        exclude_node_id: &NodeId,
    ) -> Result<Vec<Fragment<V>>, Self::Error> {
        let rows = self
            .execute(async |pool| {
                query_as::<_, FragmentRow>(
                    "
                    SELECT
                        document_id,
                        timestamp,
                        table_name,
                        row_name,
                        column_name,
                        value
                    FROM
                        fragments_v1
                    WHERE
                        document_id = ?
                        AND timestamp > ?
                        AND node_id != ?
                    ORDER BY
                        timestamp ASC
                    ",
                )
                .bind(document_id.to_string())
                .bind(since.to_string())
                .bind(exclude_node_id.to_string())
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(FragmentRow::try_into).collect()
    }

    async fn get_fragments(&self, document_id: &DocumentId) -> Result<Vec<Fragment<V>>, Self::Error> {
        let rows = self
            .execute(async |pool| {
                query_as::<_, FragmentRow>(
                    "
                    SELECT
                        document_id,
                        timestamp,
                        table_name,
                        row_name,
                        column_name,
                        value
                    FROM
                        fragments_v1
                    WHERE
                        document_id = ?
                    ORDER BY
                        timestamp ASC
                    ",
                )
                .bind(document_id.to_string())
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(FragmentRow::try_into).collect()
    }

    async fn each_fragment<F>(&self, document_id: &DocumentId, mut visit: F) -> Result<u64, Self::Error>
    where
        F: FnMut(Fragment<V>),
    {
        self.execute(async |pool| {
            // A fresh cursor per call: rows are fetched and decoded one at a time instead of
            // materializing the whole log.
            let mut rows = query_as::<_, FragmentRow>(
                "
                SELECT
                    document_id,
                    timestamp,
                    table_name,
                    row_name,
                    column_name,
                    value
                FROM
                    fragments_v1
                WHERE
                    document_id = ?
                ORDER BY
                    timestamp ASC
                ",
            )
            .bind(document_id.to_string())
            .fetch(pool);

            let mut visited = 0;

            while let Some(row) = rows.try_next().await.map_err(SqliteError::Sqlite)? {
                visit(row.try_into()?);
                visited += 1;
            }

            Ok(visited)
        })
        .await
    }
}

/// Single fragment row as it is inserted in the SQLite database.
///
/// The origin node is not selected, it is re-derived from the timestamp suffix when parsing.
#[derive(Debug, FromRow)]
struct FragmentRow {
    document_id: String,
    timestamp: String,
    table_name: String,
    row_name: String,
    column_name: String,
    value: Vec<u8>,
}

impl<V> TryFrom<FragmentRow> for Fragment<V>
where
    V: DeserializeOwned,
{
    type Error = SqliteError;

    fn try_from(row: FragmentRow) -> Result<Self, Self::Error> {
        Ok(Fragment {
            document_id: DocumentId::new(row.document_id),
            timestamp: row.timestamp.parse().map_err(
                |err: crate::timestamp::TimestampError| {
                    SqliteError::Decode("timestamp".into(), err.into())
                },
            )?,
            table: row.table_name,
            row: row.row_name,
            column: row.column_name,
            value: decode_cbor(&row.value[..])
                .map_err(|err| SqliteError::Decode("value".into(), err.into()))?,
        })
    }
}
