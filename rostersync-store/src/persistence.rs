//! File persistence helpers.
//!
//! JSON load/save with restrictive permissions, the Slack directory loader
//! and [`JsonRosterSink`], a file-backed [`MemberSink`].

use std::future::Future;
use std::path::{Path, PathBuf};

use rostersync_core::{CoreError, MemberSink, PersonRecord, SlackDirectory};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default data directory.
///
/// - macOS: `~/Library/Application Support/rostersync`
/// - Linux: `~/.local/share/rostersync`
/// - Windows: `%APPDATA%\rostersync`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rostersync")
}

/// Returns the default roster file path.
pub fn default_roster_path() -> PathBuf {
    default_data_dir().join("roster.json")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets 0o600 on Unix. Roster files hold member contact data.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data to a JSON file.
///
/// Creates parent directories, writes atomically (temp file + rename), and
/// sets restrictive permissions on Unix.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    set_restrictive_permissions(&temp_path).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

/// Loads data from a JSON file, returning the default if it is missing.
///
/// A file that exists but does not parse is an error, so a corrupt roster
/// is never silently replaced.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StoreError> {
    match load_json(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.is_not_found() => Ok(T::default()),
        Err(e) => Err(e),
    }
}

/// Loads a newline-delimited `Name|handle` Slack directory.
pub async fn load_slack_directory(path: &Path) -> Result<SlackDirectory, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    let directory = SlackDirectory::from_lines(content.lines());
    info!(path = %path.display(), entries = directory.len(), "Loaded Slack directory");
    Ok(directory)
}

// ============================================================================
// Roster Sink
// ============================================================================

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records not seen before.
    pub inserted: usize,
    /// Records that replaced an existing one.
    pub updated: usize,
}

fn same_member(existing: &PersonRecord, incoming: &PersonRecord) -> bool {
    match (existing.roster_id, incoming.roster_id) {
        (Some(a), Some(b)) => a == b,
        (None, None) => {
            let name = incoming.full_name();
            !name.is_empty() && existing.full_name().eq_ignore_ascii_case(&name)
        }
        _ => false,
    }
}

/// Merges `incoming` into `roster`, matching on roster id, or on full name
/// for records without one.
pub fn merge_records(roster: &mut Vec<PersonRecord>, incoming: &[PersonRecord]) -> MergeStats {
    let mut stats = MergeStats::default();
    for record in incoming {
        if let Some(slot) = roster.iter_mut().find(|r| same_member(r, record)) {
            *slot = record.clone();
            stats.updated += 1;
        } else {
            roster.push(record.clone());
            stats.inserted += 1;
        }
    }
    stats
}

/// Keeps the roster in a JSON file, inserting or updating by roster id.
#[derive(Debug, Clone)]
pub struct JsonRosterSink {
    path: PathBuf,
}

impl JsonRosterSink {
    /// Creates a sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a sink writing to [`default_roster_path`].
    pub fn default_location() -> Self {
        Self::new(default_roster_path())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored roster.
    pub async fn load(&self) -> Result<Vec<PersonRecord>, StoreError> {
        load_json_or_default(&self.path).await
    }

    /// Merges records into the stored roster and saves it.
    pub async fn merge(&self, records: &[PersonRecord]) -> Result<MergeStats, StoreError> {
        let mut roster = self.load().await?;
        let stats = merge_records(&mut roster, records);
        save_json(&self.path, &roster).await?;

        info!(
            path = %self.path.display(),
            inserted = stats.inserted,
            updated = stats.updated,
            total = roster.len(),
            "Roster saved"
        );
        Ok(stats)
    }
}

impl MemberSink for JsonRosterSink {
    fn upsert_members(
        &mut self,
        records: &[PersonRecord],
    ) -> impl Future<Output = Result<usize, CoreError>> + Send {
        let sink = self.clone();
        let records = records.to_vec();
        async move {
            match sink.merge(&records).await {
                Ok(stats) => Ok(stats.inserted + stats.updated),
                Err(e) => {
                    warn!(path = %sink.path.display(), error = %e, "Roster save failed");
                    Err(CoreError::Sink(e.to_string()))
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
