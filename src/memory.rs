// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use thiserror::Error;

use crate::document::{Document, DocumentId};
use crate::fragment::Fragment;
use crate::timestamp::Timestamp;

/// In-memory store.
///
/// This does not persist data permanently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// The fragment log is keyed by `(timestamp, document_id)`, the same primary key the SQLite
/// backend persists, so iterating the map already yields the causal replay order.
#[derive(Clone, Debug)]
pub struct MemoryStore<M, V> {
    pub(crate) documents: Rc<RefCell<BTreeMap<DocumentId, Document<M>>>>,
    pub(crate) fragments: Rc<RefCell<BTreeMap<(Timestamp, DocumentId), Fragment<V>>>>,
}

impl<M, V> MemoryStore<M, V> {
    pub fn new() -> Self {
        Self {
            documents: Rc::default(),
            fragments: Rc::default(),
        }
    }
}

impl<M, V> Default for MemoryStore<M, V> {
    fn default() -> Self {
        Self::new()
    }
}

// Trait implementations are in the regarding modules, see `documents` and `fragments`.

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Registration of a document whose id is already taken.
    #[error("document '{0}' is already registered")]
    DocumentExists(DocumentId),

    /// Lookup of a document id which does not exist.
    #[error("document '{0}' does not exist")]
    DocumentMissing(DocumentId),
}
