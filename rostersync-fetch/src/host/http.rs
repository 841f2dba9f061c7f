//! Portal transport.
//!
//! This module provides the [`PortalTransport`] seam the orchestrator talks
//! through, and [`HttpTransport`], its reqwest-backed implementation, which
//! adds:
//! - A spoofed desktop-browser `User-Agent`
//! - Explicit cookie replay (no hidden cookie jar; the session store owns it)
//! - Manual redirect following so cookies set on a redirect are kept
//! - A single-host allowlist
//!
//! # TLS policy
//!
//! The portal is a legacy host whose certificate chain does not validate.
//! By policy, [`TransportSettings::accept_invalid_certs`] defaults to `true`,
//! which installs a fully trusting certificate verifier. Anyone on the
//! network path can then impersonate the portal and read the credentials
//! sent at login. Pair it with [`TransportSettings::allowed_host`] so the
//! trusting client cannot be pointed at any other host, and turn it off
//! as soon as the portal serves a valid chain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue, LOCATION, SET_COOKIE};
use reqwest::{Client, StatusCode, redirect};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::TransportError;

/// Desktop browser user agent the portal is known to accept.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Content type of every POST body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Maximum redirect hops followed for one request.
const MAX_REDIRECTS: usize = 10;

// ============================================================================
// Request / Response
// ============================================================================

/// HTTP method used by the portal protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Page view.
    Get,
    /// Form postback.
    Post,
}

/// One request to the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Form-urlencoded body for POSTs.
    pub body: Option<String>,
    /// `Cookie` header value to replay.
    pub cookies: Option<String>,
}

impl PortalRequest {
    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            cookies: None,
        }
    }

    /// Creates a form POST request.
    pub fn post_form(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body.into()),
            cookies: None,
        }
    }

    /// Sets the `Cookie` header to replay.
    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// A successful portal response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalResponse {
    /// Final HTTP status.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Raw `Set-Cookie` header values from every hop, in order.
    pub set_cookies: Vec<String>,
    /// Response body.
    pub body: String,
}

impl PortalResponse {
    /// Creates a 200 response with a body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            ..Default::default()
        }
    }

    /// Adds a `Set-Cookie` header value.
    pub fn with_set_cookie(mut self, header: impl Into<String>) -> Self {
        self.set_cookies.push(header.into());
        self
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends one request to the portal and waits for the full response.
///
/// Implementations must surface every network or HTTP failure as a
/// [`TransportError`] and never retry on their own.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    /// Performs one round trip.
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, TransportError>;
}

// ============================================================================
// Cookie Helpers
// ============================================================================

/// Extracts `(name, value)` from a `Set-Cookie` header value.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Applies `Set-Cookie` values to a `Cookie` header.
///
/// Existing cookies are replaced in place; an empty value deletes the
/// cookie. Returns `None` when no cookies remain.
pub fn merge_cookie_header(existing: Option<&str>, set_cookies: &[String]) -> Option<String> {
    let mut jar: Vec<(String, String)> = existing
        .unwrap_or_default()
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    for header in set_cookies {
        let Some((name, value)) = parse_set_cookie(header) else {
            continue;
        };
        jar.retain(|(n, _)| *n != name);
        if !value.is_empty() {
            jar.push((name, value));
        }
    }

    if jar.is_empty() {
        None
    } else {
        Some(
            jar.iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Per-request timeout. `None` means no client-side timeout; callers
    /// bound the whole run instead.
    pub timeout: Option<Duration>,
    /// Trust any certificate the portal presents. See the module docs.
    pub accept_invalid_certs: bool,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// The only host requests may go to.
    pub allowed_host: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            accept_invalid_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_host: None,
        }
    }
}

/// reqwest-backed [`PortalTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
    allowed_host: Option<String>,
}

impl HttpTransport {
    /// Builds the transport.
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .redirect(redirect::Policy::none());

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        if settings.accept_invalid_certs {
            warn!(
                host = settings.allowed_host.as_deref().unwrap_or("<any>"),
                "TLS certificate validation is DISABLED for the roster portal by policy"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            inner: builder.build()?,
            allowed_host: settings.allowed_host.clone(),
        })
    }

    /// Parses a URL and checks it against the allowed host.
    fn check_url(&self, url: &str) -> Result<Url, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl("No host in URL".to_string()))?;

        match &self.allowed_host {
            Some(allowed) if !host.eq_ignore_ascii_case(allowed) => {
                Err(TransportError::HostNotAllowed(host.to_string()))
            }
            _ => Ok(parsed),
        }
    }
}

#[async_trait]
impl PortalTransport for HttpTransport {
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, TransportError> {
        let PortalRequest {
            mut method,
            mut url,
            mut body,
            mut cookies,
        } = request;
        let origin = url.clone();
        let mut set_cookies = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let parsed = self.check_url(&url)?;

            let mut builder = match method {
                Method::Get => self.inner.get(parsed.clone()),
                Method::Post => self
                    .inner
                    .post(parsed.clone())
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .body(body.clone().unwrap_or_default()),
            };
            if let Some(header) = &cookies {
                let value = HeaderValue::from_str(header)
                    .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
                builder = builder.header(COOKIE, value);
            }

            debug!(method = ?method, url = %parsed, "Sending request");
            let response = builder.send().await?;
            let status = response.status();

            let hop_cookies: Vec<String> = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            cookies = merge_cookie_header(cookies.as_deref(), &hop_cookies);
            set_cookies.extend(hop_cookies);

            if status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    let next = parsed
                        .join(location)
                        .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
                    debug!(status = %status, location = %next, "Following redirect");
                    url = next.to_string();

                    // Browsers turn 301/302/303 into a GET; 307/308 repeat the request.
                    if status != StatusCode::TEMPORARY_REDIRECT
                        && status != StatusCode::PERMANENT_REDIRECT
                    {
                        method = Method::Get;
                        body = None;
                    }
                    continue;
                }
            }

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    url,
                });
            }

            let text = response.text().await?;
            debug!(status = %status, bytes = text.len(), "Response received");
            return Ok(PortalResponse {
                status: status.as_u16(),
                url,
                set_cookies,
                body: text,
            });
        }

        Err(TransportError::TooManyRedirects(origin))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("ASP.NET_SessionId=abc123; path=/; HttpOnly"),
            Some(("ASP.NET_SessionId".to_string(), "abc123".to_string()))
        );
        assert_eq!(parse_set_cookie("garbage"), None);
        assert_eq!(parse_set_cookie("=novalue"), None);
    }

    #[test]
    fn test_merge_cookie_header() {
        let merged = merge_cookie_header(None, &["a=1; path=/".to_string()]);
        assert_eq!(merged.as_deref(), Some("a=1"));

        let merged = merge_cookie_header(Some("a=1; b=2"), &["a=3".to_string()]);
        assert_eq!(merged.as_deref(), Some("b=2; a=3"));

        let cleared = merge_cookie_header(Some("a=1"), &["a=; expires=Thu, 01 Jan 1970".to_string()]);
        assert_eq!(cleared, None);
    }

    #[test]
    fn test_host_allowlist() {
        let transport = HttpTransport::new(&TransportSettings {
            allowed_host: Some("portal.example.org".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(transport.check_url("https://portal.example.org/main.aspx").is_ok());
        assert!(transport.check_url("https://PORTAL.example.org/main.aspx").is_ok());
        assert!(matches!(
            transport.check_url("https://evil.example.com/main.aspx"),
            Err(TransportError::HostNotAllowed(_))
        ));
        assert!(matches!(
            transport.check_url("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_no_host_restriction() {
        let transport = HttpTransport::new(&TransportSettings::default()).unwrap();
        assert!(transport.check_url("https://any.example.net/").is_ok());
    }

    #[test]
    fn test_request_builders() {
        let get = PortalRequest::get("https://p/main.aspx").with_cookies(Some("a=1".into()));
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());
        assert_eq!(get.cookies.as_deref(), Some("a=1"));

        let post = PortalRequest::post_form("https://p/main.aspx", "x=1");
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.body.as_deref(), Some("x=1"));
    }
}
