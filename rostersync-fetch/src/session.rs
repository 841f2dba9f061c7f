//! Token/Session Store.
//!
//! Holds everything the portal expects a browser to carry between pages:
//! the session cookie and the three postback tokens. It is updated after
//! every round trip and owned by exactly one orchestrator for one run.
//! Nothing here is global, and nothing is persisted.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ProtocolError;
use crate::host::http::{PortalResponse, merge_cookie_header, parse_set_cookie};
use crate::html;

/// Name of the portal's session cookie.
pub const SESSION_COOKIE: &str = "ASP.NET_SessionId";

/// Structural postback field naming the control that raised the event.
pub const EVENT_TARGET: &str = "__EVENTTARGET";

/// Structural postback field carrying the event argument.
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";

// ============================================================================
// Postback Tokens
// ============================================================================

/// The opaque tokens every postback must echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostbackToken {
    /// `__VIEWSTATE`
    ViewState,
    /// `__VIEWSTATEGENERATOR`
    ViewStateGenerator,
    /// `__EVENTVALIDATION`
    EventValidation,
}

impl PostbackToken {
    /// All tokens, in the order the portal emits them.
    pub const ALL: [PostbackToken; 3] = [
        Self::ViewState,
        Self::ViewStateGenerator,
        Self::EventValidation,
    ];

    /// Returns the form field name.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ViewState => "__VIEWSTATE",
            Self::ViewStateGenerator => "__VIEWSTATEGENERATOR",
            Self::EventValidation => "__EVENTVALIDATION",
        }
    }

    /// Looks a token up by its form field name.
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.field_name() == name)
    }
}

impl fmt::Display for PostbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

static INPUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("Invalid input tag regex"));

// Async postbacks return `len|type|id|content|` records instead of a page.
static DELTA_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|hiddenField\|(__[A-Z]+)\|([^|]*)\|").expect("Invalid delta field regex")
});

/// Extracts every postback token present in a response body.
///
/// Reads hidden `<input>` elements (matching on `name` or `id`, any
/// attribute order) and async-postback delta records. Later occurrences
/// win.
pub fn extract_tokens(body: &str) -> Vec<(PostbackToken, String)> {
    let mut found: Vec<(PostbackToken, String)> = Vec::new();
    let mut record = |token: PostbackToken, value: String| {
        found.retain(|(t, _)| *t != token);
        found.push((token, value));
    };

    for tag in INPUT_TAG_RE.find_iter(body) {
        let tag = tag.as_str();
        let name = html::attr(tag, "name").or_else(|| html::attr(tag, "id"));
        let Some(token) = name.as_deref().and_then(PostbackToken::from_field_name) else {
            continue;
        };
        record(token, html::attr(tag, "value").unwrap_or_default());
    }

    for caps in DELTA_FIELD_RE.captures_iter(body) {
        if let Some(token) = PostbackToken::from_field_name(&caps[1]) {
            record(token, caps[2].to_string());
        }
    }

    found
}

// ============================================================================
// Session State
// ============================================================================

/// Cookie and postback-token state for one synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    cookies: Option<String>,
    view_state: Option<String>,
    view_state_generator: Option<String>,
    event_validation: Option<String>,
    logged_in: bool,
}

impl SessionState {
    /// Creates an empty, logged-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value of a token.
    pub fn token(&self, token: PostbackToken) -> Option<&str> {
        match token {
            PostbackToken::ViewState => self.view_state.as_deref(),
            PostbackToken::ViewStateGenerator => self.view_state_generator.as_deref(),
            PostbackToken::EventValidation => self.event_validation.as_deref(),
        }
    }

    /// Replaces a token value.
    pub fn set_token(&mut self, token: PostbackToken, value: impl Into<String>) {
        let slot = match token {
            PostbackToken::ViewState => &mut self.view_state,
            PostbackToken::ViewStateGenerator => &mut self.view_state_generator,
            PostbackToken::EventValidation => &mut self.event_validation,
        };
        *slot = Some(value.into());
    }

    /// Forgets all tokens; the next page view must issue fresh ones.
    pub fn clear_tokens(&mut self) {
        self.view_state = None;
        self.view_state_generator = None;
        self.event_validation = None;
    }

    /// Returns the `Cookie` header to replay, if any cookie was issued.
    pub fn cookie_header(&self) -> Option<String> {
        self.cookies.clone()
    }

    /// Returns the portal session cookie value.
    pub fn session_cookie(&self) -> Option<&str> {
        self.cookies.as_deref()?.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
    }

    /// Applies `Set-Cookie` header values.
    pub fn absorb_cookies(&mut self, set_cookies: &[String]) {
        for header in set_cookies {
            if let Some((name, _)) = parse_set_cookie(header) {
                debug!(cookie = %name, "Cookie issued");
            }
        }
        self.cookies = merge_cookie_header(self.cookies.as_deref(), set_cookies);
    }

    /// Updates cookies and any tokens the response carries.
    ///
    /// Tokens missing from the response keep their previous value. Returns
    /// the tokens that were updated.
    pub fn absorb(&mut self, response: &PortalResponse) -> Vec<PostbackToken> {
        self.absorb_cookies(&response.set_cookies);

        let found = extract_tokens(&response.body);
        let updated: Vec<PostbackToken> = found.iter().map(|(t, _)| *t).collect();
        for (token, value) in found {
            self.set_token(token, value);
        }
        debug!(tokens = ?updated, "Absorbed response");
        updated
    }

    /// Like [`SessionState::absorb`], but the response itself must carry
    /// all three tokens.
    pub fn absorb_required(
        &mut self,
        response: &PortalResponse,
        step: &str,
    ) -> Result<(), ProtocolError> {
        let updated = self.absorb(response);
        match PostbackToken::ALL
            .into_iter()
            .find(|t| !updated.contains(t))
        {
            Some(missing) => Err(ProtocolError::MissingToken {
                token: missing.field_name().to_string(),
                step: step.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Returns true after a completed login round trip.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Records a completed login round trip.
    pub fn mark_logged_in(&mut self) {
        self.logged_in = true;
    }

    /// Records a completed logout round trip.
    pub fn mark_logged_out(&mut self) {
        self.logged_in = false;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <form method="post" action="./main.aspx" id="form1">
        <input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
        <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDw/MTIz+NDU=" />
        <input type="hidden" value="CA0B0334" id="__VIEWSTATEGENERATOR" name="__VIEWSTATEGENERATOR" />
        <input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="/wEd&#43;AA==" />
        <input name="ctl00$MainContent$txtUserName" type="text" />
    "#;

    #[test]
    fn test_extract_tokens_from_hidden_inputs() {
        let tokens = extract_tokens(PAGE);
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains(&(PostbackToken::ViewState, "dDw/MTIz+NDU=".to_string())));
        assert!(tokens.contains(&(PostbackToken::ViewStateGenerator, "CA0B0334".to_string())));
        assert!(tokens.contains(&(PostbackToken::EventValidation, "/wEd+AA==".to_string())));
    }

    #[test]
    fn test_extract_tokens_from_delta() {
        let delta = "1|#||4|12|updatePanel|up1|<div></div>|\
                     20|hiddenField|__VIEWSTATE|bmV3/c3RhdGU=|\
                     8|hiddenField|__EVENTVALIDATION|ZXY+|";
        let tokens = extract_tokens(delta);
        assert!(tokens.contains(&(PostbackToken::ViewState, "bmV3/c3RhdGU=".to_string())));
        assert!(tokens.contains(&(PostbackToken::EventValidation, "ZXY+".to_string())));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_absorb_keeps_old_tokens_when_absent() {
        let mut session = SessionState::new();
        session.absorb(&PortalResponse::ok(PAGE));
        let updated = session.absorb(&PortalResponse::ok("<html>no tokens</html>"));
        assert!(updated.is_empty());
        assert_eq!(session.token(PostbackToken::ViewStateGenerator), Some("CA0B0334"));
    }

    #[test]
    fn test_absorb_required_reports_missing() {
        let mut session = SessionState::new();
        let page = r#"<input type="hidden" name="__VIEWSTATE" value="x" />"#;
        let err = session
            .absorb_required(&PortalResponse::ok(page), "view search page")
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingToken {
                token: "__VIEWSTATEGENERATOR".to_string(),
                step: "view search page".to_string(),
            }
        );
    }

    #[test]
    fn test_session_cookie_replay() {
        let mut session = SessionState::new();
        assert!(session.cookie_header().is_none());

        let response = PortalResponse::ok(PAGE)
            .with_set_cookie("ASP.NET_SessionId=s3ss10n; path=/; HttpOnly")
            .with_set_cookie("lb=node2; path=/");
        session.absorb(&response);

        assert_eq!(session.session_cookie(), Some("s3ss10n"));
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("ASP.NET_SessionId=s3ss10n; lb=node2")
        );
    }

    #[test]
    fn test_clear_tokens_keeps_cookies() {
        let mut session = SessionState::new();
        session.absorb(&PortalResponse::ok(PAGE).with_set_cookie("ASP.NET_SessionId=s3ss10n"));
        assert!(session.token(PostbackToken::ViewState).is_some());

        session.clear_tokens();
        assert!(PostbackToken::ALL.iter().all(|t| session.token(*t).is_none()));
        assert_eq!(session.session_cookie(), Some("s3ss10n"));
    }

    #[test]
    fn test_login_flag() {
        let mut session = SessionState::new();
        assert!(!session.is_logged_in());
        session.mark_logged_in();
        assert!(session.is_logged_in());
        session.mark_logged_out();
        assert!(!session.is_logged_in());
    }
}
