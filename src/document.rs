// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timestamp::NodeId;

/// Globally unique identifier of a collaborative document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A named collaborative object, owned by the node which registered it.
///
/// The current state of a document is not stored here, it is reconstructed by the engine through
/// replaying the document's fragment log. The store only keeps the document's identity and an
/// opaque metadata payload `M` which the engine may overwrite at any time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document<M> {
    pub id: DocumentId,
    pub node_id: NodeId,
    pub meta: M,
}

impl<M> Document<M> {
    pub fn new(id: DocumentId, node_id: NodeId, meta: M) -> Self {
        Self { id, node_id, meta }
    }
}
