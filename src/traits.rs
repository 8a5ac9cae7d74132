// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

/// Trait to implement a database transaction provider.
///
/// All writes to the store must be bracketed by an explicit transaction scope so that a logical
/// unit of work ("apply these fragments and advance local state") either lands as a whole or not
/// at all. To guard against sharing transactions unknowingly across unrelated database queries, a
/// concept of a "permit" is used which does not protect from misuse but makes "holding" a
/// transaction explicit.
pub trait Transaction {
    type Error: Error;

    type Permit;

    /// Begins a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;
}
