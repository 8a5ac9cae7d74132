// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::document::{Document, DocumentId};

/// Interface for registering and querying collaborative documents.
///
/// The metadata payload type `M` is generic and never interpreted by the store, implementors only
/// move it across their codec boundary.
pub trait DocumentStore<M> {
    type Error: Error;

    /// Register a new document.
    ///
    /// Fails when a document with the same id is already registered.
    fn insert_document(
        &self,
        document: &Document<M>,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Get a document by id.
    ///
    /// Fails when no document with this id is registered.
    fn get_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Document<M>, Self::Error>>;

    /// Get all registered documents, in no particular order.
    fn get_documents(&self) -> impl Future<Output = Result<Vec<Document<M>>, Self::Error>>;

    /// Overwrite the metadata of a document.
    ///
    /// Returns `true` when a document was updated, or `false` when no document with this id is
    /// registered and nothing happened.
    fn set_metadata(
        &self,
        id: &DocumentId,
        meta: &M,
    ) -> impl Future<Output = Result<bool, Self::Error>>;
}
