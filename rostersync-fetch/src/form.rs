//! Form-Encoder.
//!
//! Every protocol step describes its body as an ordered list of
//! [`FormField`]s. Two encoders turn that list into a body:
//!
//! - [`encode_postback`] escapes by field class. Field names and event
//!   targets get `$` escaped as `%24`, token values get `/`, `=` and `+`
//!   escaped, and user text is standard form-encoded.
//! - [`encode_standard`] encodes every pair the same way. The portal
//!   expects it for the add-member step only.
//!
//! The portal validates tokens against the exact bytes it receives, so the
//! two paths are kept separate even where their output coincides.

use std::borrow::Cow;

use url::form_urlencoded;

use crate::error::ProtocolError;
use crate::session::{EVENT_ARGUMENT, EVENT_TARGET, PostbackToken, SessionState};

/// Value source for one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Sent with an empty value.
    Empty,
    /// Current value of a postback token.
    Token(PostbackToken),
    /// A control name used as a value, e.g. an event target.
    Target(String),
    /// User-supplied or literal text.
    Text(String),
}

/// One `name=value` pair in a protocol step's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name as the portal names its controls.
    pub name: String,
    /// Value source.
    pub value: FieldValue,
}

impl FormField {
    /// A literal or user text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    /// A field sent with no value.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Empty,
        }
    }

    /// A postback token field.
    pub fn token(token: PostbackToken) -> Self {
        Self {
            name: token.field_name().to_string(),
            value: FieldValue::Token(token),
        }
    }

    /// `__EVENTTARGET` pointing at a control.
    pub fn event_target(control: impl Into<String>) -> Self {
        Self {
            name: EVENT_TARGET.to_string(),
            value: FieldValue::Target(control.into()),
        }
    }

    /// `__EVENTTARGET` and `__EVENTARGUMENT`, both empty.
    pub fn no_event() -> [Self; 2] {
        [Self::empty(EVENT_TARGET), Self::empty(EVENT_ARGUMENT)]
    }

    /// The three postback token fields.
    pub fn tokens() -> [Self; 3] {
        PostbackToken::ALL.map(Self::token)
    }
}

// ============================================================================
// Escaping
// ============================================================================

fn standard(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Escapes a structural name: `$` becomes `%24`, the rest is form-encoded.
pub fn escape_structural(s: &str) -> String {
    s.split('$').map(standard).collect::<Vec<_>>().join("%24")
}

/// Escapes a token value: `/`, `=` and `+` are escaped explicitly, the rest
/// is form-encoded.
pub fn escape_token(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        match ch {
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            '+' => out.push_str("%2B"),
            other => out.extend(form_urlencoded::byte_serialize(
                other.encode_utf8(&mut buf).as_bytes(),
            )),
        }
    }
    out
}

fn resolve<'a>(
    field: &'a FormField,
    session: &'a SessionState,
    step: &str,
) -> Result<Cow<'a, str>, ProtocolError> {
    match &field.value {
        FieldValue::Empty => Ok(Cow::Borrowed("")),
        FieldValue::Token(token) => {
            session
                .token(*token)
                .map(Cow::Borrowed)
                .ok_or_else(|| ProtocolError::MissingToken {
                    token: token.field_name().to_string(),
                    step: step.to_string(),
                })
        }
        FieldValue::Target(s) | FieldValue::Text(s) => Ok(Cow::Borrowed(s.as_str())),
    }
}

// ============================================================================
// Encoders
// ============================================================================

/// Builds a postback body with per-class escaping.
///
/// Fails if a token field is requested before the session has seen it.
pub fn encode_postback(
    fields: &[FormField],
    session: &SessionState,
    step: &str,
) -> Result<String, ProtocolError> {
    let mut pairs = Vec::with_capacity(fields.len());
    for field in fields {
        let raw = resolve(field, session, step)?;
        let value = match field.value {
            FieldValue::Empty => String::new(),
            FieldValue::Token(_) => escape_token(&raw),
            FieldValue::Target(_) => escape_structural(&raw),
            FieldValue::Text(_) => standard(&raw),
        };
        pairs.push(format!("{}={}", escape_structural(&field.name), value));
    }
    Ok(pairs.join("&"))
}

/// Builds a body with every pair standard form-encoded.
pub fn encode_standard(
    fields: &[FormField],
    session: &SessionState,
    step: &str,
) -> Result<String, ProtocolError> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for field in fields {
        let value = resolve(field, session, step)?;
        serializer.append_pair(&field.name, &value);
    }
    Ok(serializer.finish())
}

/// Decodes a form-urlencoded body into its pairs, in order.
pub fn decode_form(body: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}
