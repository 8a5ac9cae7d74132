// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::timestamp::Timestamp;

/// One immutable CRDT operation record.
///
/// A fragment assigns an opaque value `V` to a single field of a single logical record within a
/// document's state, addressed by the `(table, row, column)` coordinate. Together with the
/// timestamp this fully describes "who set what to which value, when".
///
/// Fragments are uniquely identified by `(timestamp, document_id)`: the same operation may reach
/// the store twice via different sync paths, and re-inserting an existing key is a defined no-op
/// rather than an error. Once written a fragment is never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment<V> {
    pub document_id: DocumentId,
    pub timestamp: Timestamp,
    pub table: String,
    pub row: String,
    pub column: String,
    pub value: V,
}

impl<V> Fragment<V> {
    pub fn new(
        document_id: DocumentId,
        timestamp: Timestamp,
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        value: V,
    ) -> Self {
        Self {
            document_id,
            timestamp,
            table: table.into(),
            row: row.into(),
            column: column.into(),
            value,
        }
    }
}
