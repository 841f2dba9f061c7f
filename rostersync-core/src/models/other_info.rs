//! `OtherInfo` annotation codec.
//!
//! The portal has one free-text column, "Other Info", that is used to carry
//! attributes it has no dedicated field for. Values are written as
//! `Tag=[value]` pairs separated by `"; "`:
//!
//! ```text
//! RFID=[AB12]; Slack=[@jdoe]; # of Family=[2]
//! ```
//!
//! Text that carries none of the known tags is kept whole as
//! `Additional Info`. Untagged text next to tags is appended to it, so
//! nothing typed into the portal is lost on write-back.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnnotationParseError;

// ============================================================================
// Tags
// ============================================================================

/// The well-known `OtherInfo` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherInfoTag {
    /// `Family=[...]` - household name.
    Family,
    /// `# of Family=[...]` - household size.
    NumOfFamily,
    /// `Slack=[...]` - member's chat handle.
    Slack,
    /// `Family Slack=[...]` - household's shared chat handle.
    FamilySlack,
    /// `RFID=[...]` - door access tag.
    Rfid,
    /// `Additional Info=[...]` - free text.
    AdditionalInfo,
}

impl OtherInfoTag {
    /// Order in which tags are written back to the portal.
    pub const ENCODE_ORDER: [OtherInfoTag; 6] = [
        Self::Rfid,
        Self::Slack,
        Self::Family,
        Self::NumOfFamily,
        Self::FamilySlack,
        Self::AdditionalInfo,
    ];

    /// Returns the tag text as it appears before `=[`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Family => "Family",
            Self::NumOfFamily => "# of Family",
            Self::Slack => "Slack",
            Self::FamilySlack => "Family Slack",
            Self::Rfid => "RFID",
            Self::AdditionalInfo => "Additional Info",
        }
    }

    fn pattern(&self) -> &'static Regex {
        let idx = Self::ENCODE_ORDER
            .iter()
            .position(|t| t == self)
            .unwrap_or_default();
        &TAG_PATTERNS[idx]
    }
}

impl fmt::Display for OtherInfoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// A tag only matches at the start of the string or right after a `;`, so
// `Family=` never matches inside `Family Slack=` or `# of Family=`. A value
// ends at the first `]` followed by `;` or the end of input, so values may
// contain brackets.
static TAG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    OtherInfoTag::ENCODE_ORDER
        .iter()
        .map(|tag| {
            let label = regex::escape(tag.label()).replace(' ', r"\s+");
            Regex::new(&format!(r"(?is)(?:^|;)\s*{label}\s*=\s*\[(.*?)\]\s*(?:;|$)"))
                .expect("Invalid OtherInfo tag regex")
        })
        .collect()
});

// ============================================================================
// Annotation Set
// ============================================================================

/// Decoded `OtherInfo` annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherInfo {
    /// Household name.
    pub family: Option<String>,
    /// Household size.
    pub num_of_family: Option<u32>,
    /// Member's chat handle.
    pub slack: Option<String>,
    /// Household's shared chat handle.
    pub family_slack: Option<String>,
    /// Door access tag.
    pub rfid: Option<String>,
    /// Free text.
    pub additional_info: Option<String>,
}

impl OtherInfo {
    /// Decodes an `OtherInfo` string, logging sub-fields that fail to parse.
    pub fn decode(raw: &str) -> Self {
        let (info, errors) = Self::decode_with_errors(raw);
        for err in errors {
            warn!(error = %err, "Leaving OtherInfo field unset");
        }
        info
    }

    /// Decodes an `OtherInfo` string and returns the sub-field failures.
    ///
    /// Every tag is matched independently. If none matches, the whole input
    /// becomes `additional_info` unchanged. Otherwise text outside the tags
    /// is appended to `additional_info`.
    pub fn decode_with_errors(raw: &str) -> (Self, Vec<AnnotationParseError>) {
        let mut info = Self::default();
        let mut errors = Vec::new();

        if raw.trim().is_empty() {
            return (info, errors);
        }

        let mut spans = Vec::new();
        for tag in OtherInfoTag::ENCODE_ORDER {
            let Some(caps) = tag.pattern().captures(raw) else {
                continue;
            };
            if let Some(whole) = caps.get(0) {
                spans.push(whole.range());
            }

            let value = caps.get(1).map_or("", |m| m.as_str()).trim();
            if value.is_empty() {
                continue;
            }

            if tag == OtherInfoTag::NumOfFamily {
                match value.parse::<u32>() {
                    Ok(n) => info.num_of_family = Some(n),
                    Err(source) => errors.push(AnnotationParseError {
                        tag: tag.label(),
                        value: value.to_string(),
                        source,
                    }),
                }
            } else {
                info.set(tag, Some(value.to_string()));
            }
        }

        if spans.is_empty() {
            info.additional_info = Some(raw.to_string());
        } else if let Some(rest) = untagged_text(raw, spans) {
            info.additional_info = Some(match info.additional_info.take() {
                Some(tagged) => format!("{tagged}; {rest}"),
                None => rest,
            });
        }

        (info, errors)
    }

    /// Encodes the present tags in [`OtherInfoTag::ENCODE_ORDER`].
    pub fn encode(&self) -> String {
        OtherInfoTag::ENCODE_ORDER
            .iter()
            .filter_map(|tag| {
                self.get(*tag)
                    .map(|value| format!("{}=[{}]", tag.label(), value))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns the value for a tag as text.
    pub fn get(&self, tag: OtherInfoTag) -> Option<String> {
        match tag {
            OtherInfoTag::Family => self.family.clone(),
            OtherInfoTag::NumOfFamily => self.num_of_family.map(|n| n.to_string()),
            OtherInfoTag::Slack => self.slack.clone(),
            OtherInfoTag::FamilySlack => self.family_slack.clone(),
            OtherInfoTag::Rfid => self.rfid.clone(),
            OtherInfoTag::AdditionalInfo => self.additional_info.clone(),
        }
    }

    /// Sets a text-valued tag. `NumOfFamily` is ignored unless numeric.
    pub fn set(&mut self, tag: OtherInfoTag, value: Option<String>) {
        match tag {
            OtherInfoTag::Family => self.family = value,
            OtherInfoTag::NumOfFamily => {
                self.num_of_family = value.and_then(|v| v.trim().parse().ok());
            }
            OtherInfoTag::Slack => self.slack = value,
            OtherInfoTag::FamilySlack => self.family_slack = value,
            OtherInfoTag::Rfid => self.rfid = value,
            OtherInfoTag::AdditionalInfo => self.additional_info = value,
        }
    }

    /// Returns true if no tag has a value.
    pub fn is_empty(&self) -> bool {
        OtherInfoTag::ENCODE_ORDER
            .iter()
            .all(|tag| self.get(*tag).is_none())
    }
}

/// Returns the text of `raw` outside the matched tag spans, with the `;`
/// separators around each gap trimmed off.
fn untagged_text(raw: &str, mut spans: Vec<Range<usize>>) -> Option<String> {
    spans.sort_by_key(|span| span.start);

    let mut gaps = Vec::new();
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            gaps.push(&raw[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    gaps.push(&raw[cursor..]);

    let text = gaps
        .into_iter()
        .map(|gap| gap.trim_matches(|c: char| c == ';' || c.is_whitespace()))
        .filter(|gap| !gap.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    (!text.is_empty()).then_some(text)
}

impl fmt::Display for OtherInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

// ============================================================================
// Tests
// ============================================================================
