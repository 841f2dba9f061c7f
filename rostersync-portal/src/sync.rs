//! Inbound sync facade.
//!
//! What the scheduler and the CLI call. Each call builds a fresh
//! [`RosterSession`], so concurrent calls never share session state.

use std::time::Instant;

use rostersync_core::{MemberSink, PersonRecord, SlackDirectory};
use rostersync_fetch::PortalTransport;
use serde::Serialize;
use tracing::{info, instrument};

use crate::descriptor::PortalDescriptor;
use crate::error::PortalError;
use crate::session::{Credentials, RosterSession, WriteKind};

/// Outcome of a full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records parsed from the portal.
    pub fetched: usize,
    /// Records whose Slack handle came from the directory.
    pub backfilled: usize,
    /// Records the sink accepted.
    pub accepted: usize,
    /// Wall time of the whole run.
    pub elapsed_ms: u64,
}

/// Outcome of an add-or-update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertReport {
    /// Whether the member was added or updated.
    pub added: bool,
    /// The record as written.
    pub record: PersonRecord,
}

/// Entry point for synchronization runs.
#[derive(Debug, Clone)]
pub struct RosterSync<T> {
    transport: T,
    descriptor: PortalDescriptor,
    credentials: Credentials,
    directory: SlackDirectory,
}

impl<T: PortalTransport + Clone> RosterSync<T> {
    /// Creates a facade with an empty Slack directory.
    pub fn new(transport: T, descriptor: PortalDescriptor, credentials: Credentials) -> Self {
        Self {
            transport,
            descriptor,
            credentials,
            directory: SlackDirectory::default(),
        }
    }

    /// Sets the directory used to backfill missing Slack handles.
    #[must_use]
    pub fn with_slack_directory(mut self, directory: SlackDirectory) -> Self {
        self.directory = directory;
        self
    }

    /// Builds a session for one run.
    pub fn session(&self) -> Result<RosterSession<T>, PortalError> {
        RosterSession::new(
            self.transport.clone(),
            self.descriptor.clone(),
            self.credentials.clone(),
        )
    }

    fn backfill(&self, records: &mut [PersonRecord]) -> usize {
        records
            .iter_mut()
            .map(|record| self.directory.backfill(record))
            .filter(|added| *added)
            .count()
    }

    /// Fetches the roster, backfills Slack handles and hands the records to
    /// the sink.
    #[instrument(skip(self, sink))]
    pub async fn trigger_full_sync<S: MemberSink>(&self, sink: &mut S) -> Result<SyncReport, PortalError> {
        let started = Instant::now();

        let mut records = self.session()?.fetch_all_members().await?;
        let backfilled = self.backfill(&mut records);
        let accepted = sink.upsert_members(&records).await?;

        let report = SyncReport {
            fetched: records.len(),
            backfilled,
            accepted,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            fetched = report.fetched,
            backfilled = report.backfilled,
            accepted = report.accepted,
            "Full sync complete"
        );
        Ok(report)
    }

    /// Adds or updates one member.
    ///
    /// A record without a Slack handle is backfilled from the directory
    /// before it is written.
    #[instrument(skip(self, record), fields(member = %record.full_name()))]
    pub async fn add_or_update_member(&self, record: &PersonRecord) -> Result<UpsertReport, PortalError> {
        let mut record = record.clone();
        self.directory.backfill(&mut record);

        let mut session = self.session()?;
        let written = session.upsert_member(&record).await?;
        Ok(UpsertReport {
            added: session.last_write() == Some(WriteKind::Added),
            record: written,
        })
    }

    /// Runs the existence check for a name.
    pub async fn member_exists(&self, first_name: &str, last_name: &str) -> Result<bool, PortalError> {
        self.session()?.exists_user(first_name, last_name).await
    }

    /// Deletes a member. See [`RosterSession::delete_member`].
    pub async fn delete_member(&self, roster_id: u64) -> Result<bool, PortalError> {
        self.session()?.delete_member(roster_id).await
    }
}
