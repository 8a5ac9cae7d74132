// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::btree_map::Entry;
use std::fmt::Debug;

use crate::document::DocumentId;
use crate::fragment::Fragment;
use crate::fragments::FragmentStore;
use crate::memory::{MemoryError, MemoryStore};
use crate::timestamp::{NodeId, Timestamp};

impl<M, V> FragmentStore<V> for MemoryStore<M, V>
where
    M: Clone + Debug,
    V: Clone + Debug,
{
    type Error = MemoryError;

    async fn insert_fragments(&self, fragments: &[Fragment<V>]) -> Result<u64, Self::Error> {
        let mut log = self.fragments.borrow_mut();
        let mut inserted = 0;

        for fragment in fragments {
            let key = (fragment.timestamp.clone(), fragment.document_id.clone());
            // Replayed keys are skipped, fragments are write-once.
            if let Entry::Vacant(entry) = log.entry(key) {
                entry.insert(fragment.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn get_fragments_since(
        &self,
        document_id: &DocumentId,
        since: &Timestamp,
        exclude_node_id: &NodeId,
    ) -> Result<Vec<Fragment<V>>, Self::Error> {
        let log = self.fragments.borrow();
        // The map is keyed by (timestamp, document_id), iteration is already ascending.
        Ok(log
            .values()
            .filter(|fragment| {
                fragment.document_id == *document_id
                    && fragment.timestamp > *since
                    && fragment.timestamp.node_id() != exclude_node_id
            })
            .cloned()
            .collect())
    }

    async fn get_fragments(&self, document_id: &DocumentId) -> Result<Vec<Fragment<V>>, Self::Error> {
        let log = self.fragments.borrow();
        Ok(log
            .values()
            .filter(|fragment| fragment.document_id == *document_id)
            .cloned()
            .collect())
    }

    async fn each_fragment<F>(&self, document_id: &DocumentId, mut visit: F) -> Result<u64, Self::Error>
    where
        F: FnMut(Fragment<V>),
    {
        let log = self.fragments.borrow();
        let mut visited = 0;

        for fragment in log
            .values()
            .filter(|fragment| fragment.document_id == *document_id)
        {
            visit(fragment.clone());
            visited += 1;
        }

        Ok(visited)
    }
}
