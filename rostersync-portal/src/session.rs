//! Roster Session Orchestrator.
//!
//! Drives the portal's multi-page protocol for one run. Every round trip
//! replays the session cookie and the latest postback tokens, then absorbs
//! whatever the response issued. Round trips are awaited one at a time and
//! every operation takes `&mut self`, so a session cannot interleave two
//! runs. Build one session per run.
//!
//! State machine: `LoggedOut -> login -> LoggedIn -> logout -> LoggedOut`.
//! Both transitions are skipped when already in the target state.

use std::fmt;

use rostersync_core::PersonRecord;
use rostersync_fetch::{
    FormField, PortalRequest, PortalResponse, PortalTransport, ProtocolError, SessionState,
    encode_postback, encode_standard,
};
use tracing::{debug, info, instrument, warn};

use crate::descriptor::{
    self, EXPORT_TARGET, Endpoint, LOGOUT_TARGET, PortalDescriptor, UPDATE_TARGET, USER_NAME_FIELD,
};
use crate::error::PortalError;
use crate::existence::{ExistenceCheck, UpdateLinkMarker};
use crate::parser::TableParser;

// ============================================================================
// Credentials
// ============================================================================

/// Portal login.
#[derive(Clone)]
pub struct Credentials {
    /// Portal user name.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Returns the trimmed first and last name, or the first one that is blank.
fn member_names(person: &PersonRecord) -> Result<(&str, &str), PortalError> {
    Ok((
        non_blank(person.first_name.as_deref(), "first name")?,
        non_blank(person.last_name.as_deref(), "last name")?,
    ))
}

fn non_blank<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, PortalError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(PortalError::MissingName { field })
}

// ============================================================================
// Round Trip Options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Postback,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// The response must carry all three postback tokens.
    Tokens,
    /// Take whatever the response carries.
    Any,
}

/// What [`RosterSession::upsert_member`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// No match was found; a new member was added.
    Added,
    /// A match was found and its record replaced.
    Updated,
}

// ============================================================================
// Roster Session
// ============================================================================

/// One portal session.
pub struct RosterSession<T> {
    transport: T,
    descriptor: PortalDescriptor,
    credentials: Credentials,
    state: SessionState,
    parser: TableParser,
    existence: Box<dyn ExistenceCheck>,
    last_write: Option<WriteKind>,
}

impl<T> fmt::Debug for RosterSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterSession")
            .field("descriptor", &self.descriptor)
            .field("credentials", &self.credentials)
            .field("logged_in", &self.state.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl<T: PortalTransport> RosterSession<T> {
    /// Creates a logged-out session.
    pub fn new(
        transport: T,
        descriptor: PortalDescriptor,
        credentials: Credentials,
    ) -> Result<Self, PortalError> {
        Ok(Self {
            transport,
            descriptor,
            credentials,
            state: SessionState::new(),
            parser: TableParser::new()?,
            existence: Box::new(UpdateLinkMarker::default()),
            last_write: None,
        })
    }

    /// Replaces the existence check.
    #[must_use]
    pub fn with_existence_check(mut self, check: impl ExistenceCheck + 'static) -> Self {
        self.existence = Box::new(check);
        self
    }

    /// Returns the current cookie and token state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns true between a completed login and logout.
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    /// Returns what the last [`RosterSession::upsert_member`] did.
    pub fn last_write(&self) -> Option<WriteKind> {
        self.last_write
    }

    // ------------------------------------------------------------------------
    // Round trips
    // ------------------------------------------------------------------------

    async fn round_trip(
        &mut self,
        request: PortalRequest,
        step: &str,
        expect: Expect,
    ) -> Result<PortalResponse, PortalError> {
        let request = request.with_cookies(self.state.cookie_header());
        debug!(step, method = ?request.method, url = %request.url, "Round trip");

        let response = self.transport.send(request).await?;
        match expect {
            Expect::Tokens => self.state.absorb_required(&response, step)?,
            Expect::Any => {
                self.state.absorb(&response);
            }
        }
        Ok(response)
    }

    async fn get(
        &mut self,
        endpoint: Endpoint,
        step: &str,
        expect: Expect,
    ) -> Result<PortalResponse, PortalError> {
        let request = PortalRequest::get(self.descriptor.url(endpoint));
        self.round_trip(request, step, expect).await
    }

    async fn post(
        &mut self,
        endpoint: Endpoint,
        fields: &[FormField],
        encoding: Encoding,
        step: &str,
        expect: Expect,
    ) -> Result<PortalResponse, PortalError> {
        let body = match encoding {
            Encoding::Postback => encode_postback(fields, &self.state, step)?,
            Encoding::Standard => encode_standard(fields, &self.state, step)?,
        };
        let request = PortalRequest::post_form(self.descriptor.url(endpoint), body);
        self.round_trip(request, step, expect).await
    }

    /// Logs out and passes `result` through.
    ///
    /// A logout failure after a failed step is logged; the step's error
    /// wins.
    async fn finish<R>(&mut self, result: Result<R, PortalError>) -> Result<R, PortalError> {
        match result {
            Ok(value) => {
                self.logout().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(logout_err) = self.logout().await {
                    warn!(error = %logout_err, "Logout after failed step also failed");
                }
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Session transitions
    // ------------------------------------------------------------------------

    /// Opens the portal and logs in.
    ///
    /// A transport failure is logged and leaves the session logged out;
    /// the run continues. A missing token is an error, and so is a login
    /// page served back in place of the logged-in page.
    #[instrument(skip(self), fields(user = %self.credentials.username))]
    pub async fn login(&mut self) -> Result<(), PortalError> {
        if self.state.is_logged_in() {
            debug!("Already logged in");
            return Ok(());
        }

        match self.try_login().await {
            Ok(response) => {
                if response.body.contains(USER_NAME_FIELD) && !response.body.contains(LOGOUT_TARGET) {
                    return Err(ProtocolError::MissingMarker {
                        marker: LOGOUT_TARGET.to_string(),
                        step: "login".to_string(),
                    }
                    .into());
                }
                if self.state.session_cookie().is_none() {
                    warn!("Portal issued no session cookie");
                }
                self.state.mark_logged_in();
                info!("Logged in");
                Ok(())
            }
            Err(PortalError::Transport(err)) => {
                warn!(
                    error = %err,
                    timeout = err.is_timeout(),
                    "Login round trip failed, continuing logged out"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn try_login(&mut self) -> Result<PortalResponse, PortalError> {
        self.get(Endpoint::Main, "open portal", Expect::Tokens).await?;
        let fields = descriptor::login_fields(&self.credentials.username, &self.credentials.password);
        self.post(Endpoint::Main, &fields, Encoding::Postback, "login", Expect::Any)
            .await
    }

    /// Logs out if logged in.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<(), PortalError> {
        if !self.state.is_logged_in() {
            debug!("Not logged in, skipping logout");
            return Ok(());
        }

        let fields = descriptor::event_fields(LOGOUT_TARGET);
        self.post(Endpoint::Main, &fields, Encoding::Postback, "logout", Expect::Any)
            .await?;
        self.state.mark_logged_out();
        self.state.clear_tokens();
        info!("Logged out");
        Ok(())
    }

    /// Navigates to the member search page.
    #[instrument(skip(self))]
    pub async fn view_search_page(&mut self) -> Result<(), PortalError> {
        self.get(Endpoint::SearchMembers, "view search page", Expect::Tokens)
            .await?;
        Ok(())
    }

    /// Runs a name search from the search page and returns the response.
    #[instrument(skip(self))]
    pub async fn search(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<PortalResponse, PortalError> {
        let fields = descriptor::search_fields(first_name, last_name);
        self.post(
            Endpoint::SearchMembers,
            &fields,
            Encoding::Postback,
            "search",
            Expect::Any,
        )
        .await
    }

    async fn search_exists(&mut self, first_name: &str, last_name: &str) -> Result<bool, PortalError> {
        let response = self.search(first_name, last_name).await?;
        let found = self.existence.exists(&response.body);
        debug!(found, "Existence check");
        Ok(found)
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Downloads and parses the full roster.
    ///
    /// Runs login, search page, export, logout, then parses the export.
    /// The export postback needs the authenticated session, so it must run
    /// before logout. Malformed rows are skipped and logged.
    #[instrument(skip(self))]
    pub async fn fetch_all_members(&mut self) -> Result<Vec<PersonRecord>, PortalError> {
        self.login().await?;
        let result = self.export().await;
        let body = self.finish(result).await?;

        let records = self.parser.parse_page(&body);
        info!(count = records.len(), "Fetched roster");
        Ok(records)
    }

    async fn export(&mut self) -> Result<String, PortalError> {
        self.view_search_page().await?;
        let fields = descriptor::event_fields(EXPORT_TARGET);
        let response = self
            .post(
                Endpoint::SearchMembers,
                &fields,
                Encoding::Postback,
                "export",
                Expect::Any,
            )
            .await?;
        Ok(response.body)
    }

    /// Returns true if a name search finds the member.
    #[instrument(skip(self))]
    pub async fn exists_user(&mut self, first_name: &str, last_name: &str) -> Result<bool, PortalError> {
        self.login().await?;
        let result = async {
            self.view_search_page().await?;
            self.search_exists(first_name, last_name).await
        }
        .await;
        self.finish(result).await
    }

    /// Adds the member, or updates them if a name search finds them.
    ///
    /// Returns the record as written, with `other_info_raw` set to the
    /// encoded annotations that were sent.
    ///
    /// Both names must be non-blank: the existence search runs on them, and
    /// a blank field matches every member.
    #[instrument(skip(self, person), fields(member = %person.full_name()))]
    pub async fn upsert_member(&mut self, person: &PersonRecord) -> Result<PersonRecord, PortalError> {
        let (first, last) = member_names(person)?;
        self.login().await?;
        let result = self.write_member(person, first, last).await;
        let kind = self.finish(result).await?;
        self.last_write = Some(kind);

        let mut written = person.clone();
        let encoded = written.encoded_other_info();
        written.other_info_raw = (!encoded.is_empty()).then_some(encoded);
        info!(?kind, "Member written");
        Ok(written)
    }

    async fn write_member(
        &mut self,
        person: &PersonRecord,
        first: &str,
        last: &str,
    ) -> Result<WriteKind, PortalError> {
        self.view_search_page().await?;

        let save = descriptor::save_member_fields(person);

        if self.search_exists(first, last).await? {
            let open = descriptor::event_fields(UPDATE_TARGET);
            self.post(
                Endpoint::SearchMembers,
                &open,
                Encoding::Postback,
                "open update form",
                Expect::Tokens,
            )
            .await?;
            self.post(
                Endpoint::SearchMembers,
                &save,
                Encoding::Postback,
                "update member",
                Expect::Any,
            )
            .await?;
            Ok(WriteKind::Updated)
        } else {
            let open = descriptor::add_form_fields();
            self.post(
                Endpoint::SearchMembers,
                &open,
                Encoding::Postback,
                "open add form",
                Expect::Tokens,
            )
            .await?;
            self.post(
                Endpoint::SearchMembers,
                &save,
                Encoding::Standard,
                "add member",
                Expect::Any,
            )
            .await?;
            Ok(WriteKind::Added)
        }
    }

    /// Deletes a member.
    ///
    /// Not implemented: the portal's delete flow is unknown. Logs and
    /// reports success without contacting the portal.
    #[instrument(skip(self))]
    pub async fn delete_member(&mut self, roster_id: u64) -> Result<bool, PortalError> {
        // TODO: capture the portal's delete postback and send it here.
        warn!(roster_id, "Member deletion is not implemented; nothing was sent");
        Ok(true)
    }
}
