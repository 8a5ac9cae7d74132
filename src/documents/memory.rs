// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Debug;

use crate::document::{Document, DocumentId};
use crate::documents::DocumentStore;
use crate::memory::{MemoryError, MemoryStore};

impl<M, V> DocumentStore<M> for MemoryStore<M, V>
where
    M: Clone + Debug,
    V: Clone + Debug,
{
    type Error = MemoryError;

    async fn insert_document(&self, document: &Document<M>) -> Result<(), Self::Error> {
        let mut documents = self.documents.borrow_mut();
        if documents.contains_key(&document.id) {
            return Err(MemoryError::DocumentExists(document.id.clone()));
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Document<M>, Self::Error> {
        let documents = self.documents.borrow();
        documents
            .get(id)
            .cloned()
            .ok_or_else(|| MemoryError::DocumentMissing(id.clone()))
    }

    async fn get_documents(&self) -> Result<Vec<Document<M>>, Self::Error> {
        let documents = self.documents.borrow();
        Ok(documents.values().cloned().collect())
    }

    async fn set_metadata(&self, id: &DocumentId, meta: &M) -> Result<bool, Self::Error> {
        let mut documents = self.documents.borrow_mut();
        match documents.get_mut(id) {
            Some(document) => {
                document.meta = meta.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
