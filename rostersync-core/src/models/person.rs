//! Person record types.
//!
//! This module contains the types recovered from the portal's member table:
//! - [`PersonRecord`] - One row, decoded into typed fields
//! - [`MemberType`] - Membership category
//! - [`Gender`] - Gender code
//! - [`MemberStatus`] - Membership status
//! - [`AdminLevel`] - Portal administration rights

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::other_info::OtherInfo;

/// Date format used by every date column and form field on the portal.
pub const PORTAL_DATE_FORMAT: &str = "%m/%d/%Y";

/// Parses a portal date (`MM/DD/YYYY`). Blank input yields `None`.
pub fn parse_portal_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, PORTAL_DATE_FORMAT).ok()
}

/// Formats a date the way the portal's forms expect it.
pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(PORTAL_DATE_FORMAT).to_string()
}

// ============================================================================
// Member Type
// ============================================================================

/// Membership category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    /// Single adult membership.
    Individual,
    /// Household membership.
    Family,
    /// Discounted student membership.
    Student,
    /// Discounted senior membership.
    Senior,
    /// Paid-once lifetime membership.
    Lifetime,
    /// Honorary membership.
    Honorary,
    /// Contact record without a membership.
    NonMember,
}

impl MemberType {
    /// Returns all member types.
    pub fn all() -> &'static [MemberType] {
        &[
            Self::Individual,
            Self::Family,
            Self::Student,
            Self::Senior,
            Self::Lifetime,
            Self::Honorary,
            Self::NonMember,
        ]
    }

    /// Matches a portal cell, ignoring case, hyphens, and spaces.
    ///
    /// `"Non-Member"`, `"non member"` and `"NonMember"` all match.
    pub fn from_portal(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "individual" => Some(Self::Individual),
            "family" => Some(Self::Family),
            "student" => Some(Self::Student),
            "senior" => Some(Self::Senior),
            "lifetime" => Some(Self::Lifetime),
            "honorary" => Some(Self::Honorary),
            "nonmember" => Some(Self::NonMember),
            _ => None,
        }
    }

    /// Returns the label the portal shows and accepts.
    pub fn portal_label(&self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Family => "Family",
            Self::Student => "Student",
            Self::Senior => "Senior",
            Self::Lifetime => "Lifetime",
            Self::Honorary => "Honorary",
            Self::NonMember => "Non-Member",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.portal_label())
    }
}

// ============================================================================
// Gender
// ============================================================================

/// Gender code as stored by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// `M`
    Male,
    /// `F`
    Female,
    /// `U`
    Unknown,
}

impl Gender {
    /// Matches a portal cell after uppercasing it.
    pub fn from_portal(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "M" | "MALE" => Some(Self::Male),
            "F" | "FEMALE" => Some(Self::Female),
            "U" | "UNKNOWN" | "OTHER" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Returns the single-letter code the portal accepts.
    pub fn portal_label(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.portal_label())
    }
}

// ============================================================================
// Member Status
// ============================================================================

/// Membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Paid and current.
    Active,
    /// Past the expiration date.
    Expired,
    /// Awaiting payment or approval.
    Pending,
    /// Manually deactivated.
    Inactive,
    /// Suspended by an administrator.
    Suspended,
}

impl MemberStatus {
    /// Matches a portal cell after uppercasing it.
    pub fn from_portal(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "EXPIRED" => Some(Self::Expired),
            "PENDING" => Some(Self::Pending),
            "INACTIVE" => Some(Self::Inactive),
            "SUSPENDED" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Returns the label the portal shows and accepts.
    pub fn portal_label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
            Self::Pending => "Pending",
            Self::Inactive => "Inactive",
            Self::Suspended => "Suspended",
        }
    }

    /// Returns true for members whose privileges are currently valid.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.portal_label())
    }
}

// ============================================================================
// Admin Level
// ============================================================================

/// Portal administration rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Regular member.
    None,
    /// May view the roster.
    Viewer,
    /// May edit members.
    Editor,
    /// Full administrator.
    Admin,
}

impl AdminLevel {
    /// Matches a portal cell, ignoring case.
    pub fn from_portal(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "viewer" | "view" => Some(Self::Viewer),
            "editor" | "edit" => Some(Self::Editor),
            "admin" | "administrator" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the label the portal shows and accepts.
    pub fn portal_label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Viewer => "Viewer",
            Self::Editor => "Editor",
            Self::Admin => "Admin",
        }
    }
}

// ============================================================================
// Person Record
// ============================================================================

/// One member row recovered from the portal.
///
/// Text fields are `None` when the portal cell was blank. Typed fields are
/// also `None` when the cell could not be decoded; the rest of the record
/// is still populated in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonRecord {
    /// Portal-assigned member id (column 0).
    pub roster_id: Option<u64>,
    /// Membership category.
    pub member_type: Option<MemberType>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Preferred name.
    pub nickname: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Gender code.
    pub gender: Option<Gender>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Home phone.
    pub home_phone: Option<String>,
    /// Cell phone.
    pub cell_phone: Option<String>,
    /// Work phone.
    pub work_phone: Option<String>,
    /// Street address, first line.
    pub address1: Option<String>,
    /// Street address, second line.
    pub address2: Option<String>,
    /// City.
    pub city: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Postal code.
    pub zip: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Employer.
    pub employer: Option<String>,
    /// Date the member first joined.
    pub join_date: Option<NaiveDate>,
    /// Membership status.
    pub status: Option<MemberStatus>,
    /// Date of the last renewal.
    pub last_renewed: Option<NaiveDate>,
    /// Membership expiration date.
    pub expiration: Option<NaiveDate>,
    /// The raw `OtherInfo` cell as the portal returned it.
    pub other_info_raw: Option<String>,
    /// Annotations decoded from `other_info_raw`.
    pub other_info: OtherInfo,
    /// Primary member of the household.
    pub primary_member: Option<String>,
    /// Emergency contact name.
    pub emergency_contact: Option<String>,
    /// Emergency contact phone.
    pub emergency_phone: Option<String>,
    /// Portal login name.
    pub username: Option<String>,
    /// Portal administration rights.
    pub admin_level: Option<AdminLevel>,
    /// Last portal login, as displayed.
    pub last_login: Option<String>,
    /// Record creation date.
    pub created: Option<NaiveDate>,
    /// Personal website.
    pub website: Option<String>,
    /// Serves as a club officer.
    pub club_officer: bool,
    /// Sits on the board.
    pub board_member: bool,
    /// Volunteers for events.
    pub volunteer_events: bool,
    /// Volunteers to teach classes.
    pub volunteer_classes: bool,
    /// Volunteers for facility upkeep.
    pub volunteer_facilities: bool,
    /// Subscribed to the newsletter.
    pub newsletter: bool,
    /// Profile photo URL.
    pub photo_url: Option<String>,
    /// Last modification timestamp, as displayed.
    pub last_modified: Option<String>,
    /// Administrator notes.
    pub notes: Option<String>,
}

impl PersonRecord {
    /// Creates an empty record with a first and last name.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Default::default()
        }
    }

    /// Returns "First Last", skipping whichever part is missing.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stores a raw `OtherInfo` string and decodes it.
    pub fn set_other_info(&mut self, raw: &str) {
        self.other_info = OtherInfo::decode(raw);
        self.other_info_raw = if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        };
    }

    /// Returns the `OtherInfo` string to write back to the portal.
    ///
    /// This is re-encoded from [`PersonRecord::other_info`], so edits made
    /// to the decoded annotations (such as a backfilled Slack handle) are
    /// included.
    pub fn encoded_other_info(&self) -> String {
        self.other_info.encode()
    }

    /// Returns the member's chat handle, if any.
    pub fn slack_handle(&self) -> Option<&str> {
        self.other_info.slack.as_deref()
    }

    /// Returns the member's RFID tag, if any.
    pub fn rfid(&self) -> Option<&str> {
        self.other_info.rfid.as_deref()
    }

    /// Returns true if the membership is active and not past expiration.
    pub fn is_current_on(&self, today: NaiveDate) -> bool {
        let active = self.status.is_some_and(|s| s.is_current());
        let unexpired = self.expiration.is_none_or(|exp| exp >= today);
        active && unexpired
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_strips_hyphens() {
        assert_eq!(MemberType::from_portal("Non-Member"), Some(MemberType::NonMember));
        assert_eq!(MemberType::from_portal("non member"), Some(MemberType::NonMember));
        assert_eq!(MemberType::from_portal("FAMILY"), Some(MemberType::Family));
        assert_eq!(MemberType::from_portal("Corporate"), None);
    }

    #[test]
    fn test_member_type_label_roundtrip() {
        for kind in MemberType::all() {
            assert_eq!(MemberType::from_portal(kind.portal_label()), Some(*kind));
        }
    }

    #[test]
    fn test_gender_uppercases() {
        assert_eq!(Gender::from_portal("m"), Some(Gender::Male));
        assert_eq!(Gender::from_portal(" female "), Some(Gender::Female));
        assert_eq!(Gender::from_portal("x"), None);
    }

    #[test]
    fn test_status_uppercases() {
        assert_eq!(MemberStatus::from_portal("active"), Some(MemberStatus::Active));
        assert_eq!(MemberStatus::from_portal("Expired"), Some(MemberStatus::Expired));
        assert_eq!(MemberStatus::from_portal("gone"), None);
    }

    #[test]
    fn test_portal_date() {
        let date = parse_portal_date("03/07/2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(format_portal_date(date), "03/07/2025");
        assert!(parse_portal_date("2025-03-07").is_none());
        assert!(parse_portal_date("  ").is_none());
    }

    #[test]
    fn test_full_name() {
        let person = PersonRecord::new("Jane", "Doe");
        assert_eq!(person.full_name(), "Jane Doe");

        let mut partial = PersonRecord::default();
        partial.last_name = Some("Doe".to_string());
        assert_eq!(partial.full_name(), "Doe");
    }

    #[test]
    fn test_set_other_info_keeps_raw() {
        let mut person = PersonRecord::new("Jane", "Doe");
        person.set_other_info("RFID=[AB12]");
        assert_eq!(person.other_info_raw.as_deref(), Some("RFID=[AB12]"));
        assert_eq!(person.rfid(), Some("AB12"));
    }

    #[test]
    fn test_is_current_on() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut person = PersonRecord::new("Jane", "Doe");
        person.status = Some(MemberStatus::Active);
        person.expiration = NaiveDate::from_ymd_opt(2025, 12, 31);
        assert!(person.is_current_on(today));

        person.expiration = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(!person.is_current_on(today));

        person.expiration = None;
        person.status = Some(MemberStatus::Pending);
        assert!(!person.is_current_on(today));
    }
}
