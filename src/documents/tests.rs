// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};

use crate::document::{Document, DocumentId};
use crate::documents::DocumentStore;
use crate::memory::{MemoryError, MemoryStore};
use crate::sqlite::{SqliteError, SqliteStore};
use crate::timestamp::NodeId;
use crate::traits::Transaction;

fn test_document(id: &str, node: &str, meta: Value) -> Document<Value> {
    Document::new(DocumentId::new(id), NodeId::new(node), meta)
}

#[tokio::test]
async fn insert_get_documents_memory() {
    let store = MemoryStore::<Value, Value>::new();

    // Nothing registered yet.
    assert!(store.get_documents().await.unwrap().is_empty());

    let document_1 = test_document("d1", "n1", json!({ "title": "meeting notes" }));
    let document_2 = test_document("d2", "n2", json!({ "title": "shopping list", "pinned": true }));

    store.insert_document(&document_1).await.unwrap();
    store.insert_document(&document_2).await.unwrap();

    // Re-registering a taken id fails.
    assert!(matches!(
        store.insert_document(&document_1).await,
        Err(MemoryError::DocumentExists(ref id)) if *id == document_1.id
    ));

    // Get
    // ~~~

    assert_eq!(
        store.get_document(&document_1.id).await.unwrap(),
        document_1
    );

    let missing = DocumentId::new("nope");
    assert!(matches!(
        store.get_document(&missing).await,
        Err(MemoryError::DocumentMissing(ref id)) if *id == missing
    ));

    let mut all = store.get_documents().await.unwrap();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(all, vec![document_1.clone(), document_2.clone()]);

    // Set metadata
    // ~~~~~~~~~~~~

    let meta = json!({ "title": "meeting notes", "archived": true });
    assert!(store.set_metadata(&document_1.id, &meta).await.unwrap());
    assert_eq!(store.get_document(&document_1.id).await.unwrap().meta, meta);

    // Updating an unregistered document changes nothing and reports it.
    assert!(!store.set_metadata(&missing, &meta).await.unwrap());
    assert_eq!(store.get_documents().await.unwrap().len(), 2);
}

#[tokio::test]
async fn insert_get_documents_sqlite() {
    let store = SqliteStore::temporary().await;

    assert!(
        DocumentStore::<Value>::get_documents(&store)
            .await
            .unwrap()
            .is_empty()
    );

    let document_1 = test_document("d1", "n1", json!({ "title": "meeting notes" }));
    let document_2 = test_document("d2", "n2", json!({ "title": "shopping list", "pinned": true }));

    // Insert
    // ~~~~~~

    let permit = store.begin().await.unwrap();

    store.insert_document(&document_1).await.unwrap();
    store.insert_document(&document_2).await.unwrap();

    // Re-registering a taken id fails with a typed error.
    assert!(matches!(
        store.insert_document(&document_1).await,
        Err(SqliteError::DocumentExists(ref id)) if *id == document_1.id
    ));

    store.commit(permit).await.unwrap();

    // Get
    // ~~~

    // Metadata comes back unchanged after its round trip through the codec.
    assert_eq!(
        store.get_document(&document_1.id).await.unwrap(),
        document_1
    );

    let missing = DocumentId::new("nope");
    assert!(matches!(
        DocumentStore::<Value>::get_document(&store, &missing).await,
        Err(SqliteError::DocumentMissing(ref id)) if *id == missing
    ));

    let mut all: Vec<Document<Value>> = store.get_documents().await.unwrap();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(all, vec![document_1.clone(), document_2.clone()]);

    // Set metadata
    // ~~~~~~~~~~~~

    let permit = store.begin().await.unwrap();

    let meta = json!({ "title": "meeting notes", "archived": true });
    assert!(store.set_metadata(&document_1.id, &meta).await.unwrap());

    // Updating an unregistered document changes nothing and reports it.
    assert!(!store.set_metadata(&missing, &meta).await.unwrap());

    store.commit(permit).await.unwrap();

    assert_eq!(
        DocumentStore::<Value>::get_document(&store, &document_1.id)
            .await
            .unwrap()
            .meta,
        meta
    );
    assert_eq!(
        DocumentStore::<Value>::get_documents(&store)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn writes_require_transaction_sqlite() {
    let store = SqliteStore::temporary().await;

    let document = test_document("d1", "n1", json!({}));

    // No transaction was begun, writes are rejected.
    assert!(matches!(
        store.insert_document(&document).await,
        Err(SqliteError::TransactionMissing)
    ));
    assert!(matches!(
        store.set_metadata(&document.id, &json!({})).await,
        Err(SqliteError::TransactionMissing)
    ));

    // .. while committed reads work without one.
    assert!(
        DocumentStore::<Value>::get_documents(&store)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn uncommitted_documents_are_invisible_sqlite() {
    let store = SqliteStore::temporary().await;

    let document = test_document("d1", "n1", json!({ "draft": true }));

    let permit = store.begin().await.unwrap();
    store.insert_document(&document).await.unwrap();
    store.rollback(permit).await.unwrap();

    // The rolled-back registration left no trace.
    assert!(matches!(
        DocumentStore::<Value>::get_document(&store, &document.id).await,
        Err(SqliteError::DocumentMissing(_))
    ));
    assert!(
        DocumentStore::<Value>::get_documents(&store)
            .await
            .unwrap()
            .is_empty()
    );
}
