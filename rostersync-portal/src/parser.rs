//! HTML Table Parser.
//!
//! Maps each data row of the export table onto a [`PersonRecord`] by
//! position. The layout is a declarative list of [`ColumnSpec`]s checked
//! once, when the parser is built.
//!
//! A row with too few cells, or whose id does not decode, is skipped. Any
//! other cell that fails to decode is logged and left unset.

use chrono::NaiveDate;
use rostersync_core::{
    AdminLevel, Gender, MemberStatus, MemberType, PORTAL_DATE_FORMAT, PersonRecord,
};
use tracing::{debug, warn};

use crate::error::{FieldError, LayoutError, RowParseError};
use crate::table;

/// Number of columns the portal's export table carries.
pub const EXPECTED_COLUMNS: usize = 40;

/// Decodes one trimmed cell into a record.
pub type ColumnDecoder = fn(&mut PersonRecord, &str) -> Result<(), FieldError>;

/// Maps one column index onto a record field.
#[derive(Clone, Copy)]
pub struct ColumnSpec {
    /// Zero-based column index.
    pub index: usize,
    /// Field name, for logs and errors.
    pub name: &'static str,
    /// A failure skips the whole row instead of leaving the field unset.
    pub required: bool,
    /// Cell decoder.
    pub decode: ColumnDecoder,
}

impl std::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Cell Decoders
// ============================================================================

fn text(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn date(cell: &str) -> Result<Option<NaiveDate>, FieldError> {
    if cell.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(cell, PORTAL_DATE_FORMAT)
        .map(Some)
        .map_err(|_| FieldError::Date(cell.to_string()))
}

fn known<T>(cell: &str, from_portal: fn(&str) -> Option<T>) -> Result<Option<T>, FieldError> {
    if cell.is_empty() {
        return Ok(None);
    }
    from_portal(cell)
        .map(Some)
        .ok_or_else(|| FieldError::UnknownValue(cell.to_string()))
}

fn yes(cell: &str) -> bool {
    cell.eq_ignore_ascii_case("yes")
}

fn roster_id(record: &mut PersonRecord, cell: &str) -> Result<(), FieldError> {
    if cell.is_empty() {
        return Err(FieldError::Empty);
    }
    let id = cell.parse::<u64>().map_err(|source| FieldError::Integer {
        value: cell.to_string(),
        source,
    })?;
    record.roster_id = Some(id);
    Ok(())
}

macro_rules! text_column {
    ($index:expr, $field:ident) => {
        ColumnSpec {
            index: $index,
            name: stringify!($field),
            required: false,
            decode: |r, c| {
                r.$field = text(c);
                Ok(())
            },
        }
    };
}

macro_rules! date_column {
    ($index:expr, $field:ident) => {
        ColumnSpec {
            index: $index,
            name: stringify!($field),
            required: false,
            decode: |r, c| {
                r.$field = date(c)?;
                Ok(())
            },
        }
    };
}

macro_rules! flag_column {
    ($index:expr, $field:ident) => {
        ColumnSpec {
            index: $index,
            name: stringify!($field),
            required: false,
            decode: |r, c| {
                r.$field = yes(c);
                Ok(())
            },
        }
    };
}

/// The portal's export layout.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec {
            index: 0,
            name: "roster_id",
            required: true,
            decode: roster_id,
        },
        ColumnSpec {
            index: 1,
            name: "member_type",
            required: false,
            decode: |r, c| {
                r.member_type = known(c, MemberType::from_portal)?;
                Ok(())
            },
        },
        text_column!(2, first_name),
        text_column!(3, last_name),
        text_column!(4, nickname),
        text_column!(5, email),
        ColumnSpec {
            index: 6,
            name: "gender",
            required: false,
            decode: |r, c| {
                r.gender = known(c, Gender::from_portal)?;
                Ok(())
            },
        },
        date_column!(7, birth_date),
        text_column!(8, home_phone),
        text_column!(9, cell_phone),
        text_column!(10, work_phone),
        text_column!(11, address1),
        text_column!(12, address2),
        text_column!(13, city),
        text_column!(14, state),
        text_column!(15, zip),
        text_column!(16, country),
        text_column!(17, employer),
        date_column!(18, join_date),
        ColumnSpec {
            index: 19,
            name: "status",
            required: false,
            decode: |r, c| {
                r.status = known(c, MemberStatus::from_portal)?;
                Ok(())
            },
        },
        date_column!(20, last_renewed),
        date_column!(21, expiration),
        ColumnSpec {
            index: 22,
            name: "other_info",
            required: false,
            decode: |r, c| {
                r.set_other_info(c);
                Ok(())
            },
        },
        text_column!(23, primary_member),
        text_column!(24, emergency_contact),
        text_column!(25, emergency_phone),
        text_column!(26, username),
        ColumnSpec {
            index: 27,
            name: "admin_level",
            required: false,
            decode: |r, c| {
                r.admin_level = known(c, AdminLevel::from_portal)?;
                Ok(())
            },
        },
        text_column!(28, last_login),
        date_column!(29, created),
        text_column!(30, website),
        flag_column!(31, club_officer),
        flag_column!(32, board_member),
        flag_column!(33, volunteer_events),
        flag_column!(34, volunteer_classes),
        flag_column!(35, volunteer_facilities),
        flag_column!(36, newsletter),
        text_column!(37, photo_url),
        text_column!(38, last_modified),
        text_column!(39, notes),
    ]
}

// ============================================================================
// Parser
// ============================================================================

/// Records recovered from one page, plus the rows that were skipped.
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// One record per well-formed row, in page order.
    pub records: Vec<PersonRecord>,
    /// Why each skipped row was skipped.
    pub skipped: Vec<RowParseError>,
}

/// Positional row parser with a validated layout.
#[derive(Debug, Clone)]
pub struct TableParser {
    columns: Vec<ColumnSpec>,
    expected: usize,
}

impl TableParser {
    /// Builds a parser for the portal's export layout.
    pub fn new() -> Result<Self, LayoutError> {
        Self::with_layout(default_columns(), EXPECTED_COLUMNS)
    }

    /// Builds a parser for a custom layout.
    ///
    /// Every index in `0..expected` must be mapped exactly once.
    pub fn with_layout(mut columns: Vec<ColumnSpec>, expected: usize) -> Result<Self, LayoutError> {
        columns.sort_by_key(|c| c.index);

        for pair in columns.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(LayoutError::DuplicateColumn(pair[0].index));
            }
        }
        if let Some(col) = columns.iter().find(|c| c.index >= expected) {
            return Err(LayoutError::OutOfRange {
                index: col.index,
                expected,
            });
        }
        if let Some(missing) = (0..expected).find(|i| columns.get(*i).is_none_or(|c| c.index != *i)) {
            return Err(LayoutError::Unmapped(missing));
        }

        Ok(Self { columns, expected })
    }

    /// Number of cells a row needs.
    pub fn expected_columns(&self) -> usize {
        self.expected
    }

    /// Parses one row's cell texts. `row` is only used in errors.
    ///
    /// Cells past the layout are ignored.
    pub fn parse_row(&self, row: usize, cells: &[String]) -> Result<PersonRecord, RowParseError> {
        if cells.len() < self.expected {
            return Err(RowParseError::MissingColumns {
                row,
                found: cells.len(),
                expected: self.expected,
            });
        }

        let mut record = PersonRecord::default();
        for spec in &self.columns {
            let cell = cells[spec.index].trim();
            if let Err(source) = (spec.decode)(&mut record, cell) {
                if spec.required {
                    return Err(RowParseError::Required {
                        row,
                        column: spec.index,
                        name: spec.name,
                        source,
                    });
                }
                warn!(row, column = spec.index, field = spec.name, error = %source, "Leaving field unset");
            }
        }
        Ok(record)
    }

    /// Parses every data row in a page, collecting skipped rows.
    pub fn parse_page_with_errors(&self, body: &str) -> ParsedPage {
        let mut page = ParsedPage::default();
        for (row, cells) in table::data_rows(body).iter().enumerate() {
            match self.parse_row(row, cells) {
                Ok(record) => page.records.push(record),
                Err(err) => page.skipped.push(err),
            }
        }
        debug!(
            records = page.records.len(),
            skipped = page.skipped.len(),
            "Parsed results table"
        );
        page
    }

    /// Parses every data row in a page, logging skipped rows.
    pub fn parse_page(&self, body: &str) -> Vec<PersonRecord> {
        let page = self.parse_page_with_errors(body);
        for err in &page.skipped {
            warn!(error = %err, "Skipping row");
        }
        page.records
    }
}
