//! Orchestrator tests against the scripted portal.

use rostersync_core::{MemberSink, OtherInfoTag, PersonRecord, SlackDirectory};
use rostersync_fetch::{Method, PortalResponse, PostbackToken, ProtocolError, decode_form};

use crate::descriptor::{EXPORT_TARGET, LOGOUT_TARGET, PortalDescriptor, SAVE_MEMBER_BUTTON, UPDATE_TARGET};
use crate::error::PortalError;
use crate::session::{Credentials, RosterSession, WriteKind};
use crate::sync::RosterSync;
use crate::test_support::{BASE_URL, ScriptedTransport, results_table, row, token_page};

fn session(transport: &ScriptedTransport) -> RosterSession<ScriptedTransport> {
    RosterSession::new(
        transport.clone(),
        PortalDescriptor::new(BASE_URL).unwrap(),
        Credentials::new("frontdesk", "s3cret/pass"),
    )
    .unwrap()
}

fn pair(body: &str, name: &str) -> Option<String> {
    decode_form(body)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

fn logged_in_script() -> ScriptedTransport {
    ScriptedTransport::new()
        .respond(token_page(1, "").with_set_cookie("ASP.NET_SessionId=abc123; path=/; HttpOnly"))
        .respond(token_page(2, "<a id=\"lnkLogout\">Log out</a>"))
        .respond(token_page(3, "<input name=\"ctl00$MainContent$txtFirstName\" />"))
}

// ============================================================================
// Login / Logout
// ============================================================================

#[tokio::test]
async fn test_login_replays_cookie_and_tokens() {
    let transport = ScriptedTransport::new()
        .respond(token_page(1, "").with_set_cookie("ASP.NET_SessionId=abc123; path=/"))
        .respond(token_page(2, "welcome"));
    let mut session = session(&transport);

    session.login().await.unwrap();
    assert!(session.is_logged_in());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(requests[0].url, "https://members.example.org/main.aspx");
    assert!(requests[0].cookies.is_none());

    let login = &requests[1];
    assert_eq!(login.method, Method::Post);
    assert_eq!(login.cookies.as_deref(), Some("ASP.NET_SessionId=abc123"));
    let body = login.body.as_deref().unwrap();
    assert!(body.contains("__VIEWSTATE=VS%2F1%2B%3D"));
    assert!(body.contains("ctl00%24MainContent%24btnLogin=Log+In"));
    assert_eq!(pair(body, "ctl00$MainContent$txtPassword").as_deref(), Some("s3cret/pass"));
}

#[tokio::test]
async fn test_login_is_idempotent() {
    let transport = ScriptedTransport::new()
        .respond(token_page(1, ""))
        .respond(token_page(2, ""));
    let mut session = session(&transport);

    session.login().await.unwrap();
    session.login().await.unwrap();
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_login_transport_failure_continues_logged_out() {
    let transport = ScriptedTransport::new().fail(503);
    let mut session = session(&transport);

    session.login().await.unwrap();
    assert!(!session.is_logged_in());

    // Logout is skipped while logged out.
    session.logout().await.unwrap();
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_login_missing_token_is_protocol_error() {
    let transport = ScriptedTransport::new().respond(PortalResponse::ok("<html>maintenance</html>"));
    let mut session = session(&transport);

    let err = session.login().await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Protocol(ProtocolError::MissingToken { ref step, .. }) if step == "open portal"
    ));
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_login_form_served_again_is_rejected() {
    let transport = ScriptedTransport::new()
        .respond(token_page(1, ""))
        .respond(token_page(
            2,
            r#"<span>Invalid password</span><input name="ctl00$MainContent$txtUserName" />"#,
        ));
    let mut session = session(&transport);

    let err = session.login().await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Protocol(ProtocolError::MissingMarker { ref marker, ref step })
            if marker == LOGOUT_TARGET && step == "login"
    ));
    assert!(!session.is_logged_in());
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_logout_posts_logout_target() {
    let transport = ScriptedTransport::new()
        .respond(token_page(1, ""))
        .respond(token_page(2, ""))
        .respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    session.login().await.unwrap();
    session.logout().await.unwrap();
    assert!(!session.is_logged_in());

    let requests = transport.requests();
    let body = requests[2].body.as_deref().unwrap();
    assert_eq!(pair(body, "__EVENTTARGET").as_deref(), Some(LOGOUT_TARGET));
    assert_eq!(pair(body, "__VIEWSTATE").as_deref(), Some("VS/2+="));
    assert!(session.state().token(PostbackToken::ViewState).is_none());

    session.logout().await.unwrap();
    assert_eq!(transport.requests().len(), 3);
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_all_members_skips_short_row() {
    let short = "<tr><td>99</td><td>Family</td><td>Short</td><td>Row</td><td>x</td></tr>".to_string();
    let table = results_table(&[row("1042", "Jane", "Doe"), short]);
    let transport = logged_in_script()
        .respond(token_page(4, &table))
        .respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    let records = session.fetch_all_members().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].roster_id, Some(1042));
    assert_eq!(records[0].full_name(), "Jane Doe");
    assert!(!session.is_logged_in());

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[2].url, "https://members.example.org/searchmembers.aspx");

    let export = requests[3].body.as_deref().unwrap();
    assert!(export.starts_with("__EVENTTARGET=ctl00%24MainContent%24lnkExport&"));
    assert_eq!(pair(export, "__EVENTTARGET").as_deref(), Some(EXPORT_TARGET));
    assert_eq!(pair(export, "__VIEWSTATEGENERATOR").as_deref(), Some("GEN3"));
    assert!(requests.iter().all(|r| r.url.starts_with(BASE_URL)));
    assert!(
        requests[1..]
            .iter()
            .all(|r| r.cookies.as_deref() == Some("ASP.NET_SessionId=abc123"))
    );
    assert_eq!(pair(requests[4].body.as_deref().unwrap(), "__EVENTTARGET").as_deref(), Some(LOGOUT_TARGET));
}

#[tokio::test]
async fn test_fetch_all_members_empty_table() {
    let transport = logged_in_script()
        .respond(token_page(4, &results_table(&[])))
        .respond(PortalResponse::ok("bye"));
    let records = session(&transport).fetch_all_members().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fetch_transport_failure_still_logs_out() {
    let transport = logged_in_script().fail(500).respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    let err = session.fetch_all_members().await.unwrap_err();
    assert!(err.is_transport());
    assert!(!session.is_logged_in());

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    let body = requests[4].body.as_deref().unwrap();
    assert_eq!(pair(body, "__EVENTTARGET").as_deref(), Some(LOGOUT_TARGET));
}

#[tokio::test]
async fn test_search_page_without_tokens_fails() {
    let transport = ScriptedTransport::new()
        .respond(token_page(1, ""))
        .respond(token_page(2, ""))
        .respond(PortalResponse::ok("<html>session expired</html>"))
        .respond(PortalResponse::ok("bye"));
    let err = session(&transport).fetch_all_members().await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Protocol(ProtocolError::MissingToken { ref step, .. }) if step == "view search page"
    ));
}

// ============================================================================
// Existence
// ============================================================================

#[tokio::test]
async fn test_exists_user_true() {
    let found = r#"<a id="ctl00_MainContent_gvResults_ctl02_lnkUpdate">Update</a>"#;
    let transport = logged_in_script()
        .respond(token_page(4, found))
        .respond(PortalResponse::ok("bye"));

    assert!(session(&transport).exists_user("Jane", "Doe").await.unwrap());

    let requests = transport.requests();
    let search = requests[3].body.as_deref().unwrap();
    assert_eq!(pair(search, "ctl00$MainContent$txtFirstName").as_deref(), Some("Jane"));
    assert_eq!(pair(search, "ctl00$MainContent$txtLastName").as_deref(), Some("Doe"));
    assert_eq!(pair(search, "ctl00$MainContent$btnSearch").as_deref(), Some("Search"));
}

#[tokio::test]
async fn test_exists_user_false() {
    let transport = logged_in_script()
        .respond(token_page(4, "<span>No members found.</span>"))
        .respond(PortalResponse::ok("bye"));

    assert!(!session(&transport).exists_user("Jane", "Doe").await.unwrap());
}

// ============================================================================
// Upsert / Delete
// ============================================================================

fn jane() -> PersonRecord {
    let mut person = PersonRecord::new("Jane", "Doe");
    person.email = Some("jane@example.org".to_string());
    person.other_info.set(OtherInfoTag::Rfid, Some("AB12".to_string()));
    person
}

#[tokio::test]
async fn test_upsert_adds_when_missing() {
    let transport = logged_in_script()
        .respond(token_page(4, "<span>No members found.</span>"))
        .respond(token_page(5, "<input name=\"ctl00$MainContent$fvMember$txtFirstName\" />"))
        .respond(token_page(6, "saved"))
        .respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    let written = session.upsert_member(&jane()).await.unwrap();
    assert_eq!(session.last_write(), Some(WriteKind::Added));
    assert_eq!(written.other_info_raw.as_deref(), Some("RFID=[AB12]"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 7);

    let open = requests[4].body.as_deref().unwrap();
    assert_eq!(pair(open, "ctl00$MainContent$btnAddMember").as_deref(), Some("Add Member"));

    let save = requests[5].body.as_deref().unwrap();
    assert_eq!(pair(save, "__VIEWSTATE").as_deref(), Some("VS/5+="));
    assert_eq!(pair(save, "ctl00$MainContent$fvMember$txtEmail").as_deref(), Some("jane@example.org"));
    assert_eq!(pair(save, "ctl00$MainContent$fvMember$txtOtherInfo").as_deref(), Some("RFID=[AB12]"));
    assert_eq!(pair(save, SAVE_MEMBER_BUTTON.0).as_deref(), Some("Save"));
}

#[tokio::test]
async fn test_upsert_updates_when_found() {
    let found = r#"<a id="ctl00_MainContent_gvResults_ctl02_lnkUpdate">Update</a>"#;
    let transport = logged_in_script()
        .respond(token_page(4, found))
        .respond(token_page(5, "edit form"))
        .respond(token_page(6, "saved"))
        .respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    session.upsert_member(&jane()).await.unwrap();
    assert_eq!(session.last_write(), Some(WriteKind::Updated));

    let requests = transport.requests();
    let open = requests[4].body.as_deref().unwrap();
    assert_eq!(pair(open, "__EVENTTARGET").as_deref(), Some(UPDATE_TARGET));
    let save = requests[5].body.as_deref().unwrap();
    assert!(save.contains("ctl00%24MainContent%24fvMember%24txtFirstName=Jane"));
    assert!(save.contains("__EVENTVALIDATION=EV5%3D%3D"));
}

#[tokio::test]
async fn test_upsert_refuses_blank_names_before_login() {
    let transport = ScriptedTransport::new();
    let mut session = session(&transport);

    let mut no_last = PersonRecord::new("Jane", "Doe");
    no_last.last_name = None;
    let err = session.upsert_member(&no_last).await.unwrap_err();
    assert!(matches!(err, PortalError::MissingName { field: "last name" }));

    let blank_first = PersonRecord::new("   ", "Doe");
    let err = session.upsert_member(&blank_first).await.unwrap_err();
    assert!(matches!(err, PortalError::MissingName { field: "first name" }));

    assert!(transport.requests().is_empty());
    assert_eq!(session.last_write(), None);
}

#[tokio::test]
async fn test_upsert_searches_trimmed_names() {
    let transport = logged_in_script()
        .respond(token_page(4, "none"))
        .respond(token_page(5, "form"))
        .respond(token_page(6, "saved"))
        .respond(PortalResponse::ok("bye"));
    let mut session = session(&transport);

    session
        .upsert_member(&PersonRecord::new(" Jane ", "Doe "))
        .await
        .unwrap();
    let search = transport.requests()[3].body.clone().unwrap();
    assert_eq!(pair(&search, "ctl00$MainContent$txtFirstName").as_deref(), Some("Jane"));
    assert_eq!(pair(&search, "ctl00$MainContent$txtLastName").as_deref(), Some("Doe"));
}

#[tokio::test]
async fn test_delete_member_is_a_stub() {
    let transport = ScriptedTransport::new();
    let mut session = session(&transport);

    assert!(session.delete_member(1042).await.unwrap());
    assert!(transport.requests().is_empty());
}

// ============================================================================
// Facade
// ============================================================================

struct CountingSink {
    batches: Vec<usize>,
}

impl MemberSink for CountingSink {
    fn upsert_members(
        &mut self,
        records: &[PersonRecord],
    ) -> impl std::future::Future<Output = Result<usize, rostersync_core::CoreError>> + Send {
        self.batches.push(records.len());
        let accepted = records.len();
        async move { Ok(accepted) }
    }
}

#[tokio::test]
async fn test_full_sync_backfills_and_sinks() {
    let table = results_table(&[row("1", "Jane", "Doe"), row("2", "John", "Roe")]);
    let transport = logged_in_script()
        .respond(token_page(4, &table))
        .respond(PortalResponse::ok("bye"));
    let sync = RosterSync::new(
        transport.clone(),
        PortalDescriptor::new(BASE_URL).unwrap(),
        Credentials::new("frontdesk", "pw"),
    )
    .with_slack_directory(SlackDirectory::from_lines(["Jane Doe|@jdoe", "Someone Else|@else"]));

    let mut records: Vec<PersonRecord> = Vec::new();
    let report = sync.trigger_full_sync(&mut records).await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.backfilled, 1);
    assert_eq!(report.accepted, 2);
    assert_eq!(records[0].slack_handle(), Some("@jdoe"));
    assert_eq!(records[1].slack_handle(), None);
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test]
async fn test_full_sync_runs_use_fresh_sessions() {
    let table = results_table(&[row("1", "Jane", "Doe")]);
    let mut transport = ScriptedTransport::new();
    for _ in 0..2 {
        transport = transport
            .respond(token_page(1, "").with_set_cookie("ASP.NET_SessionId=abc123; path=/"))
            .respond(token_page(2, ""))
            .respond(token_page(3, ""))
            .respond(token_page(4, &table))
            .respond(PortalResponse::ok("bye"));
    }
    let sync = RosterSync::new(
        transport.clone(),
        PortalDescriptor::new(BASE_URL).unwrap(),
        Credentials::new("frontdesk", "pw"),
    );

    let mut sink = CountingSink { batches: Vec::new() };
    sync.trigger_full_sync(&mut sink).await.unwrap();
    sync.trigger_full_sync(&mut sink).await.unwrap();
    assert_eq!(sink.batches, vec![1, 1]);

    // The second run starts without the first run's cookie.
    let requests = transport.requests();
    assert_eq!(requests.len(), 10);
    assert!(requests[5].cookies.is_none());
}

#[tokio::test]
async fn test_add_or_update_member_reports_added() {
    let transport = logged_in_script()
        .respond(token_page(4, "none"))
        .respond(token_page(5, "form"))
        .respond(token_page(6, "saved"))
        .respond(PortalResponse::ok("bye"));
    let sync = RosterSync::new(
        transport.clone(),
        PortalDescriptor::new(BASE_URL).unwrap(),
        Credentials::new("frontdesk", "pw"),
    )
    .with_slack_directory(SlackDirectory::from_lines(["Jane Doe|@jdoe"]));

    let report = sync.add_or_update_member(&jane()).await.unwrap();
    assert!(report.added);
    assert_eq!(report.record.slack_handle(), Some("@jdoe"));
    assert_eq!(
        report.record.other_info_raw.as_deref(),
        Some("RFID=[AB12]; Slack=[@jdoe]")
    );
}
