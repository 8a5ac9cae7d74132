// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::document::DocumentId;
use crate::fragment::Fragment;
use crate::timestamp::{NodeId, Timestamp};

/// Interface for the append-only, per-document fragment log.
///
/// Fragments are write-once: the only state transition is "absent to present" and re-attempting it
/// is idempotent. The value payload type `V` is generic and never interpreted by the store.
pub trait FragmentStore<V> {
    type Error: Error;

    /// Insert a batch of fragments.
    ///
    /// Each fragment is inserted independently; a fragment whose `(timestamp, document_id)` key
    /// already exists is silently skipped, as the same fragment may arrive twice via different
    /// sync paths. Atomicity of the batch comes from the enclosing transaction.
    ///
    /// Returns the number of fragments actually inserted, net of idempotent skips.
    fn insert_fragments(
        &self,
        fragments: &[Fragment<V>],
    ) -> impl Future<Output = Result<u64, Self::Error>>;

    /// Get all fragments of a document with a timestamp strictly greater than `since`, excluding
    /// fragments originated by `exclude_node_id`, ascending by timestamp.
    ///
    /// This is the anti-entropy primitive: a replica asks "what has happened since my last known
    /// point, that I didn't produce myself" and never re-receives its own writes during sync.
    fn get_fragments_since(
        &self,
        document_id: &DocumentId,
        since: &Timestamp,
        exclude_node_id: &NodeId,
    ) -> impl Future<Output = Result<Vec<Fragment<V>>, Self::Error>>;

    /// Get the complete fragment log of a document, ascending by timestamp.
    ///
    /// This is the deterministic replay order the engine's merge logic depends on.
    fn get_fragments(
        &self,
        document_id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<Fragment<V>>, Self::Error>>;

    /// Visit the complete fragment log of a document, ascending by timestamp, without
    /// materializing it.
    ///
    /// Every call starts a fresh traversal over the same deterministic order, decoding one
    /// fragment at a time, so very large logs can be replayed in constant memory. Completes only
    /// after the last fragment was visited and returns the number of fragments seen.
    fn each_fragment<F>(
        &self,
        document_id: &DocumentId,
        visit: F,
    ) -> impl Future<Output = Result<u64, Self::Error>>
    where
        F: FnMut(Fragment<V>);
}
