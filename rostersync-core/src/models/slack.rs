//! Slack directory used to backfill missing chat handles.
//!
//! The directory is an externally supplied list of pipe-delimited entries:
//!
//! ```text
//! Jane Doe|@jdoe|U024BE7LH
//! ```
//!
//! Only the first two fields are used. A member without a handle of their
//! own picks up the handle of the first entry whose display name contains
//! both their first and last name.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::person::PersonRecord;
use crate::error::CoreError;

/// One `Display Name|handle|...` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackDirectoryEntry {
    /// Display name as shown in Slack.
    pub display_name: String,
    /// Chat handle.
    pub handle: String,
}

impl FromStr for SlackDirectoryEntry {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('|');
        let display_name = parts.next().unwrap_or_default().trim();
        let handle = parts.next().unwrap_or_default().trim();

        if display_name.is_empty() || handle.is_empty() {
            return Err(CoreError::InvalidData(format!(
                "Slack directory entry needs 'Name|handle': {s:?}"
            )));
        }

        Ok(Self {
            display_name: display_name.to_string(),
            handle: handle.to_string(),
        })
    }
}

/// Read-only list of Slack directory entries.
#[derive(Debug, Clone, Default)]
pub struct SlackDirectory {
    entries: Vec<SlackDirectoryEntry>,
}

impl SlackDirectory {
    /// Creates a directory from already-parsed entries.
    pub fn new(entries: Vec<SlackDirectoryEntry>) -> Self {
        Self { entries }
    }

    /// Parses raw `Name|handle` lines, skipping blank and malformed ones.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = lines
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref();
                if line.trim().is_empty() {
                    return None;
                }
                match line.parse() {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!(error = %e, "Skipping Slack directory line");
                        None
                    }
                }
            })
            .collect();
        Self { entries }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries.
    pub fn entries(&self) -> &[SlackDirectoryEntry] {
        &self.entries
    }

    /// Finds the handle of the first entry whose display name contains both
    /// names, ignoring case.
    pub fn find_handle(&self, first_name: &str, last_name: &str) -> Option<&str> {
        let first = first_name.trim().to_lowercase();
        let last = last_name.trim().to_lowercase();
        if first.is_empty() || last.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| {
                let name = entry.display_name.to_lowercase();
                name.contains(&first) && name.contains(&last)
            })
            .map(|entry| entry.handle.as_str())
    }

    /// Fills in the record's chat handle if it has none.
    ///
    /// Returns true if a handle was added.
    pub fn backfill(&self, record: &mut PersonRecord) -> bool {
        if record.other_info.slack.is_some() {
            return false;
        }
        let (Some(first), Some(last)) = (record.first_name.as_deref(), record.last_name.as_deref())
        else {
            return false;
        };

        match self.find_handle(first, last) {
            Some(handle) => {
                debug!(member = %record.full_name(), handle, "Backfilled Slack handle");
                record.other_info.slack = Some(handle.to_string());
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> SlackDirectory {
        SlackDirectory::from_lines([
            "Jane Doe|@jdoe|U01",
            "",
            "no handle here",
            "John Q. Public|@jqp",
        ])
    }

    #[test]
    fn test_from_lines_skips_malformed() {
        let dir = directory();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.entries()[0].handle, "@jdoe");
    }

    #[test]
    fn test_find_handle_substring_match() {
        let dir = directory();
        assert_eq!(dir.find_handle("jane", "DOE"), Some("@jdoe"));
        assert_eq!(dir.find_handle("John", "Public"), Some("@jqp"));
        assert_eq!(dir.find_handle("Jane", "Public"), None);
        assert_eq!(dir.find_handle("", "Doe"), None);
    }

    #[test]
    fn test_backfill_only_when_missing() {
        let dir = directory();

        let mut person = PersonRecord::new("Jane", "Doe");
        assert!(dir.backfill(&mut person));
        assert_eq!(person.slack_handle(), Some("@jdoe"));

        let mut has_own = PersonRecord::new("Jane", "Doe");
        has_own.other_info.slack = Some("@janed".to_string());
        assert!(!dir.backfill(&mut has_own));
        assert_eq!(has_own.slack_handle(), Some("@janed"));
    }

    #[test]
    fn test_backfill_needs_both_names() {
        let dir = directory();
        let mut person = PersonRecord::default();
        person.first_name = Some("Jane".to_string());
        assert!(!dir.backfill(&mut person));
    }
}
