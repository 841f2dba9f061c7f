//! Portal descriptor.
//!
//! Endpoints, control names and the field list of every protocol step.
//! Control names follow the portal's web-forms naming; they are sent
//! verbatim and escaped by the form encoder.

use rostersync_core::{PersonRecord, format_portal_date};
use rostersync_fetch::{EVENT_ARGUMENT, FormField};
use url::Url;

use crate::error::PortalError;

// ============================================================================
// Control Names
// ============================================================================

/// Login form.
pub const USER_NAME_FIELD: &str = "ctl00$MainContent$txtUserName";
/// Login form.
pub const PASSWORD_FIELD: &str = "ctl00$MainContent$txtPassword";
/// Login button.
pub const LOGIN_BUTTON: (&str, &str) = ("ctl00$MainContent$btnLogin", "Log In");

/// Search form.
pub const SEARCH_FIRST_NAME_FIELD: &str = "ctl00$MainContent$txtFirstName";
/// Search form.
pub const SEARCH_LAST_NAME_FIELD: &str = "ctl00$MainContent$txtLastName";
/// Search button.
pub const SEARCH_BUTTON: (&str, &str) = ("ctl00$MainContent$btnSearch", "Search");

/// Opens the blank member form.
pub const ADD_MEMBER_BUTTON: (&str, &str) = ("ctl00$MainContent$btnAddMember", "Add Member");
/// Saves the member form.
pub const SAVE_MEMBER_BUTTON: (&str, &str) = ("ctl00$MainContent$btnSaveMember", "Save");

/// Event target of the export link on the search page.
pub const EXPORT_TARGET: &str = "ctl00$MainContent$lnkExport";
/// Event target of the first result row's update link.
pub const UPDATE_TARGET: &str = "ctl00$MainContent$gvResults$ctl02$lnkUpdate";
/// Event target of the logout link in the page header.
pub const LOGOUT_TARGET: &str = "ctl00$lnkLogout";

/// Present in a search result body when at least one row matched.
pub const UPDATE_MARKER: &str = "lnkUpdate";

/// Id fragment of the results grid.
pub const RESULTS_GRID_ID: &str = "gvResults";

const MEMBER_FORM_PREFIX: &str = "ctl00$MainContent$fvMember$";

// ============================================================================
// Endpoints
// ============================================================================

/// The two pages the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Landing page with the login form and the logout link.
    Main,
    /// Member search, export and edit page.
    SearchMembers,
}

impl Endpoint {
    /// Path relative to the portal base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Main => "main.aspx",
            Self::SearchMembers => "searchmembers.aspx",
        }
    }
}

/// Where the portal lives.
#[derive(Debug, Clone)]
pub struct PortalDescriptor {
    base_url: Url,
}

impl PortalDescriptor {
    /// Builds a descriptor from the portal base URL.
    ///
    /// The base is treated as a directory: `https://host/club` and
    /// `https://host/club/` both resolve `main.aspx` under `/club/`.
    pub fn new(base_url: &str) -> Result<Self, PortalError> {
        let mut url =
            Url::parse(base_url).map_err(|e| PortalError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(PortalError::InvalidBaseUrl(base_url.to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self { base_url: url })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the portal host name.
    pub fn host(&self) -> Option<&str> {
        self.base_url.host_str()
    }

    /// Returns the absolute URL of an endpoint.
    pub fn url(&self, endpoint: Endpoint) -> String {
        self.base_url
            .join(endpoint.path())
            .map_or_else(|_| format!("{}{}", self.base_url, endpoint.path()), String::from)
    }
}

// ============================================================================
// Step Field Lists
// ============================================================================

fn postback(event: Option<&str>, extra: impl IntoIterator<Item = FormField>) -> Vec<FormField> {
    let mut fields = match event {
        Some(target) => vec![FormField::event_target(target), FormField::empty(EVENT_ARGUMENT)],
        None => FormField::no_event().to_vec(),
    };
    fields.extend(FormField::tokens());
    fields.extend(extra);
    fields
}

fn button((name, value): (&str, &str)) -> FormField {
    FormField::text(name, value)
}

/// Login postback.
pub fn login_fields(username: &str, password: &str) -> Vec<FormField> {
    postback(
        None,
        [
            FormField::text(USER_NAME_FIELD, username),
            FormField::text(PASSWORD_FIELD, password),
            button(LOGIN_BUTTON),
        ],
    )
}

/// Search postback.
pub fn search_fields(first_name: &str, last_name: &str) -> Vec<FormField> {
    postback(
        None,
        [
            FormField::text(SEARCH_FIRST_NAME_FIELD, first_name),
            FormField::text(SEARCH_LAST_NAME_FIELD, last_name),
            button(SEARCH_BUTTON),
        ],
    )
}

/// Link-click postback: `__EVENTTARGET` set, tokens, nothing else.
pub fn event_fields(target: &str) -> Vec<FormField> {
    postback(Some(target), [])
}

/// Opens the blank member form.
pub fn add_form_fields() -> Vec<FormField> {
    postback(None, [button(ADD_MEMBER_BUTTON)])
}

/// Saves the member form.
pub fn save_member_fields(person: &PersonRecord) -> Vec<FormField> {
    let mut fields = postback(None, member_form_fields(person));
    fields.push(button(SAVE_MEMBER_BUTTON));
    fields
}

fn member_field(control: &str, value: Option<String>) -> FormField {
    FormField::text(format!("{MEMBER_FORM_PREFIX}{control}"), value.unwrap_or_default())
}

/// The member form's inputs, filled from a record.
///
/// Display-only columns (id, last login, created, photo, last modified)
/// have no input. Unchecked checkboxes are omitted as a browser would.
pub fn member_form_fields(person: &PersonRecord) -> Vec<FormField> {
    let text = |v: &Option<String>| v.clone();
    let date = |v: &Option<chrono::NaiveDate>| v.map(format_portal_date);

    let mut fields = vec![
        member_field(
            "ddlMemberType",
            person.member_type.map(|t| t.portal_label().to_string()),
        ),
        member_field("txtFirstName", text(&person.first_name)),
        member_field("txtLastName", text(&person.last_name)),
        member_field("txtNickname", text(&person.nickname)),
        member_field("txtEmail", text(&person.email)),
        member_field("ddlGender", person.gender.map(|g| g.portal_label().to_string())),
        member_field("txtBirthDate", date(&person.birth_date)),
        member_field("txtHomePhone", text(&person.home_phone)),
        member_field("txtCellPhone", text(&person.cell_phone)),
        member_field("txtWorkPhone", text(&person.work_phone)),
        member_field("txtAddress1", text(&person.address1)),
        member_field("txtAddress2", text(&person.address2)),
        member_field("txtCity", text(&person.city)),
        member_field("txtState", text(&person.state)),
        member_field("txtZip", text(&person.zip)),
        member_field("txtCountry", text(&person.country)),
        member_field("txtEmployer", text(&person.employer)),
        member_field("txtJoinDate", date(&person.join_date)),
        member_field("ddlStatus", person.status.map(|s| s.portal_label().to_string())),
        member_field("txtLastRenewed", date(&person.last_renewed)),
        member_field("txtExpiration", date(&person.expiration)),
        member_field("txtOtherInfo", Some(person.encoded_other_info())),
        member_field("txtPrimaryMember", text(&person.primary_member)),
        member_field("txtEmergencyContact", text(&person.emergency_contact)),
        member_field("txtEmergencyPhone", text(&person.emergency_phone)),
        member_field("txtUserName", text(&person.username)),
        member_field(
            "ddlAdminLevel",
            person.admin_level.map(|a| a.portal_label().to_string()),
        ),
        member_field("txtWebsite", text(&person.website)),
    ];

    let flags = [
        ("chkClubOfficer", person.club_officer),
        ("chkBoardMember", person.board_member),
        ("chkVolunteerEvents", person.volunteer_events),
        ("chkVolunteerClasses", person.volunteer_classes),
        ("chkVolunteerFacilities", person.volunteer_facilities),
        ("chkNewsletter", person.newsletter),
    ];
    fields.extend(
        flags
            .into_iter()
            .filter(|(_, checked)| *checked)
            .map(|(control, _)| member_field(control, Some("on".to_string()))),
    );

    fields.push(member_field("txtNotes", text(&person.notes)));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostersync_core::{MemberStatus, OtherInfoTag};
    use rostersync_fetch::FieldValue;

    fn value_of<'a>(fields: &'a [FormField], name: &str) -> Option<&'a FieldValue> {
        fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    #[test]
    fn test_endpoint_urls() {
        let with_dir = PortalDescriptor::new("https://members.example.org/club").unwrap();
        assert_eq!(
            with_dir.url(Endpoint::Main),
            "https://members.example.org/club/main.aspx"
        );
        let root = PortalDescriptor::new("https://members.example.org/").unwrap();
        assert_eq!(
            root.url(Endpoint::SearchMembers),
            "https://members.example.org/searchmembers.aspx"
        );
        assert_eq!(root.host(), Some("members.example.org"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(PortalDescriptor::new("not a url").is_err());
        assert!(PortalDescriptor::new("ftp://members.example.org").is_err());
    }

    #[test]
    fn test_login_field_order() {
        let names: Vec<_> = login_fields("desk", "pw").into_iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "__EVENTTARGET",
                "__EVENTARGUMENT",
                "__VIEWSTATE",
                "__VIEWSTATEGENERATOR",
                "__EVENTVALIDATION",
                USER_NAME_FIELD,
                PASSWORD_FIELD,
                LOGIN_BUTTON.0,
            ]
        );
    }

    #[test]
    fn test_event_fields() {
        let fields = event_fields(EXPORT_TARGET);
        assert_eq!(
            fields[0].value,
            FieldValue::Target(EXPORT_TARGET.to_string())
        );
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_member_form_fields() {
        let mut person = PersonRecord::new("Jane", "Doe");
        person.status = Some(MemberStatus::Active);
        person.newsletter = true;
        person.other_info.set(OtherInfoTag::Slack, Some("@jdoe".to_string()));

        let fields = save_member_fields(&person);
        assert_eq!(
            value_of(&fields, "ctl00$MainContent$fvMember$txtFirstName"),
            Some(&FieldValue::Text("Jane".to_string()))
        );
        assert_eq!(
            value_of(&fields, "ctl00$MainContent$fvMember$ddlStatus"),
            Some(&FieldValue::Text("Active".to_string()))
        );
        assert_eq!(
            value_of(&fields, "ctl00$MainContent$fvMember$txtOtherInfo"),
            Some(&FieldValue::Text("Slack=[@jdoe]".to_string()))
        );
        assert!(value_of(&fields, "ctl00$MainContent$fvMember$chkNewsletter").is_some());
        assert!(value_of(&fields, "ctl00$MainContent$fvMember$chkBoardMember").is_none());
        assert_eq!(fields.last().map(|f| f.name.as_str()), Some(SAVE_MEMBER_BUTTON.0));
    }
}
