//! Text output formatting with colors.

use std::fmt::Write;
use std::path::Path;

use chrono::{Local, NaiveDate};
use rostersync_core::{PersonRecord, format_portal_date};
use rostersync_portal::{SyncReport, UpsertReport};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";

const NAME_WIDTH: usize = 28;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    today: NaiveDate,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            today: Local::now().date_naive(),
        }
    }

    /// Pins the date used to decide whether a membership is current.
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Formats records as an aligned table, one member per line.
    pub fn format_records(&self, records: &[PersonRecord]) -> String {
        if records.is_empty() {
            return format!("{}\n", self.dim("No members returned."));
        }

        let mut out = String::new();
        let header = format!(
            "{:>6}  {:<NAME_WIDTH$}  {:<12}  {:<10}  {:<10}  {}",
            "Id", "Name", "Type", "Status", "Expires", "Slack"
        );
        let _ = writeln!(out, "{}", self.bold(&header));

        for record in records {
            let id = record.roster_id.map(|id| id.to_string()).unwrap_or_default();
            let member_type = record.member_type.map(|t| t.portal_label()).unwrap_or("");
            let expires = record.expiration.map(format_portal_date).unwrap_or_default();
            let status = self.status_cell(record);
            let _ = writeln!(
                out,
                "{id:>6}  {:<NAME_WIDTH$}  {member_type:<12}  {status}  {expires:<10}  {}",
                truncate(&record.full_name(), NAME_WIDTH),
                record.slack_handle().unwrap_or("")
            );
        }
        out
    }

    fn status_cell(&self, record: &PersonRecord) -> String {
        let label = record.status.map(|s| s.portal_label()).unwrap_or("");
        let padded = format!("{label:<10}");
        if record.status.is_none() {
            padded
        } else if record.is_current_on(self.today) {
            self.green(&padded)
        } else {
            self.red(&padded)
        }
    }

    /// Formats the one-line summary of a sync run.
    pub fn format_sync_report(&self, report: &SyncReport, saved_to: Option<&Path>) -> String {
        let mut line = format!(
            "Fetched {} members ({} Slack handles backfilled) in {}ms",
            report.fetched, report.backfilled, report.elapsed_ms
        );
        if let Some(path) = saved_to {
            let _ = write!(line, ", saved to {}", path.display());
        }
        self.bold(&line)
    }

    /// Formats the outcome of an add-or-update.
    pub fn format_upsert(&self, report: &UpsertReport) -> String {
        let verb = if report.added { "Added" } else { "Updated" };
        let mut out = format!("{} {}", self.bold(verb), report.record.full_name());
        if let Some(other_info) = report.record.other_info_raw.as_deref().filter(|s| !s.is_empty()) {
            let _ = write!(out, "\n{}", self.dim(&format!("Other info: {other_info}")));
        }
        out
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            format!("{BOLD}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        if self.use_colors {
            format!("{GREEN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.use_colors {
            format!("{RED}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Cuts `text` to `width` characters, marking the cut with an ellipsis.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
