//! Trait definitions for `RosterSync`.
//!
//! This module defines the seam between the roster client and the
//! persistence collaborator that stores member records.

use crate::error::CoreError;
use crate::models::PersonRecord;

/// Receives the records produced by a full synchronization run.
///
/// Implementors own the insert-or-update decision: they look each record up
/// by its external id (`roster_id`) and merge it into their own store. The
/// roster client never decides insert versus update for this path.
pub trait MemberSink: Send {
    /// Hands over every record from one run.
    ///
    /// Returns the number of records the sink accepted.
    fn upsert_members(
        &mut self,
        records: &[PersonRecord],
    ) -> impl std::future::Future<Output = Result<usize, CoreError>> + Send;
}

/// In-memory sink, mostly useful for tests and dry runs.
impl MemberSink for Vec<PersonRecord> {
    fn upsert_members(
        &mut self,
        records: &[PersonRecord],
    ) -> impl std::future::Future<Output = Result<usize, CoreError>> + Send {
        self.extend_from_slice(records);
        let accepted = records.len();
        async move { Ok(accepted) }
    }
}
