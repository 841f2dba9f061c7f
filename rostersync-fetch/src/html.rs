//! Minimal HTML helpers.
//!
//! The portal's markup is machine-generated and regular enough that a full
//! DOM is unnecessary: the session store needs hidden-input attribute values
//! and the table parser needs `<tr>`/`<td>` blocks with their text.

use std::sync::LazyLock;

use regex::Regex;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid attribute regex")
});

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("Invalid entity regex"));

/// Decodes the named entities the portal emits and all numeric entities.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    // `&amp;` last so `&amp;lt;` decodes to `&lt;`, not `<`.
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapses runs of whitespace to one space and trims.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Removes tags, then decodes entities and normalizes whitespace.
pub fn cell_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

/// Returns the entity-decoded value of an attribute inside one start tag.
pub fn attr(tag: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
        Some(decode_entities(value))
    })
}

/// Finds successive `<tag ...>...</tag>` blocks, case-insensitively.
///
/// Yields `(block_start, inner_start, inner_end, block_end)` byte offsets.
/// Nesting of the same tag is not supported.
pub fn tag_blocks(s: &str, tag: &str) -> TagBlocks {
    TagBlocks {
        lower: s.to_ascii_lowercase(),
        open: format!("<{}", tag.to_ascii_lowercase()),
        close: format!("</{}", tag.to_ascii_lowercase()),
        pos: 0,
    }
}

/// Iterator returned by [`tag_blocks`].
#[derive(Debug)]
pub struct TagBlocks {
    lower: String,
    open: String,
    close: String,
    pos: usize,
}

impl TagBlocks {
    fn is_tag_boundary(&self, at: usize) -> bool {
        self.lower
            .as_bytes()
            .get(at)
            .is_some_and(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
    }
}

impl Iterator for TagBlocks {
    type Item = (usize, usize, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.lower.get(self.pos..)?.find(&self.open)? + self.pos;
            let after_name = start + self.open.len();
            if !self.is_tag_boundary(after_name) {
                // `<th` must not match `<thead`.
                self.pos = after_name;
                continue;
            }

            let inner_start = self.lower[start..].find('>')? + start + 1;
            let next_open = self.lower[inner_start..]
                .find(&self.open)
                .map(|i| i + inner_start);
            let close = self.lower[inner_start..]
                .find(&self.close)
                .map(|i| i + inner_start);

            // Unclosed `<td>`/`<tr>` end where the next sibling opens.
            let inner_end = match (close, next_open) {
                (Some(c), Some(n)) if n < c => n,
                (Some(c), _) => c,
                (None, Some(n)) => n,
                (None, None) => self.lower.len(),
            };
            let block_end = if close == Some(inner_end) {
                self.lower[inner_end..]
                    .find('>')
                    .map_or(self.lower.len(), |i| inner_end + i + 1)
            } else {
                inner_end
            };

            self.pos = block_end.max(inner_start);
            return Some((start, inner_start, inner_end, block_end));
        }
    }
}
