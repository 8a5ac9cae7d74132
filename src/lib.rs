// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence backends for a CRDT-based collaborative document engine.
//!
//! The engine itself (conflict-free merge logic, timestamp generation, client-facing API) lives
//! elsewhere; this crate is the storage contract it relies on to durably record and retrieve two
//! kinds of state:
//!
//! - **Documents**: named collaborative objects, each owned by the node which registered it and
//!   carrying a mutable, opaque metadata payload.
//! - **Fragments**: immutable, timestamp-ordered operation records which together reconstruct a
//!   document's state through CRDT replay.
//!
//! The fragment log is append-only and node-attributed. Its key queries are built for
//! anti-entropy sync between replicas: idempotent batch inserts (re-delivery of the same fragment
//! is a no-op), "everything since this timestamp, excluding my own writes", and a streaming
//! traversal of the full log for state reconstruction.
//!
//! ## Transactions
//!
//! Multiple writes to the database are grouped into one single, atomic transaction when they need
//! to strictly _all_ occur or _none_ occur. The [`Transaction`] trait provides `begin`, `commit`
//! and `rollback`; nothing written inside a transaction is visible outside the store before
//! commit, and an abandoned transaction leaves no trace. Committed reads do not require a
//! transaction.
//!
//! ## Backends
//!
//! A SQLite storage solution is provided in the form of a [`SqliteStore`], gated by the `sqlite`
//! feature flag. An in-memory solution for development and test contexts is provided in the form
//! of a [`MemoryStore`], gated by the `memory` feature flag. Both are enabled by default.
//!
//! Payloads (document metadata and fragment values) are generic `serde` types; the SQLite backend
//! moves them through a CBOR codec boundary and never interprets them.
#[cfg(feature = "sqlite")]
pub mod cbor;
pub mod document;
pub mod documents;
pub mod fragment;
pub mod fragments;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod timestamp;
pub mod traits;

pub use document::{Document, DocumentId};
pub use documents::DocumentStore;
pub use fragment::Fragment;
pub use fragments::FragmentStore;
#[cfg(feature = "memory")]
pub use memory::{MemoryError, MemoryStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
pub use timestamp::{NodeId, Timestamp, TimestampError};
pub use traits::Transaction;
