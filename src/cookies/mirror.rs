//! Cookie header mirror.
//!
//! The mirror is a **snapshot** of the host's cookie header string taken at
//! the last [`CookieMirror::rebuild`]. It is never patched incrementally: every
//! rebuild throws the previous mapping away and re-parses the header.
//!
//! ## Parsing rules
//! - Segments are separated by `;` followed by any run of whitespace
//!   (`' '`, `\t`, `\r`, `\n`, `\x0c`). An empty header has no segments.
//! - Each segment is split on its **first** `=`. The name is everything before
//!   it, the value everything after it, so values may themselves contain `=`.
//! - A segment without `=` (e.g. a bare `HttpOnly`) is dropped silently.
//! - Values are decoded as JSON when possible and kept as the raw string
//!   otherwise.
//! - When a name occurs more than once the last occurrence wins, but the entry
//!   keeps the position of its first occurrence.
//!
//! The header is third-party influenced, so none of this can fail.

use serde_json::{Map, Value};

/// Name → decoded value, in insertion order.
pub type CookieMap = Map<String, Value>;

/// Whitespace skipped after each `;` separator.
fn is_separator_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0c')
}

/// Decodes a raw cookie value, falling back to the raw text.
fn decode_value(raw: &str, decode_json: bool) -> Value {
    if decode_json {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

/// Parses a cookie header string.
///
/// Returns the mapping and the number of segments seen, dropped ones included.
pub fn parse_cookie_header(header: &str, decode_json: bool) -> (CookieMap, usize) {
    let mut map = CookieMap::new();
    if header.is_empty() {
        return (map, 0);
    }

    let mut seen = 0;
    for segment in header.split(';') {
        seen += 1;
        // The first segment keeps any leading whitespace, like the header itself.
        let segment = if seen == 1 { segment } else { segment.trim_start_matches(is_separator_space) };

        match segment.split_once('=') {
            Some((name, raw)) => {
                map.insert(name.to_string(), decode_value(raw, decode_json));
            }
            None => log::trace!("dropping cookie segment without '=': {:?}", segment),
        }
    }

    (map, seen)
}

/// In-memory mirror of the host's cookie header.
#[derive(Debug, Clone)]
pub struct CookieMirror {
    entries: CookieMap,
    last_segment_count: usize,
    decode_json: bool,
}

impl Default for CookieMirror {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CookieMirror {
    /// Creates an empty mirror. `decode_json` controls value decoding on rebuild.
    pub fn new(decode_json: bool) -> Self {
        Self {
            entries: CookieMap::new(),
            last_segment_count: 0,
            decode_json,
        }
    }

    /// Replaces the mapping with a fresh parse of `header`.
    ///
    /// Returns the number of segments seen (including dropped ones).
    pub fn rebuild(&mut self, header: &str) -> usize {
        let (entries, seen) = parse_cookie_header(header, self.decode_json);
        log::trace!("cookie mirror rebuilt: {} segments, {} entries", seen, entries.len());

        self.entries = entries;
        self.last_segment_count = seen;
        seen
    }

    /// Segment count of the last rebuild.
    pub fn last_segment_count(&self) -> usize {
        self.last_segment_count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> &CookieMap {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Query-string form: `enc(name)=enc(json(value))` pairs joined by `&`.
    ///
    /// `null` values produce an empty payload rather than the text `null`.
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| {
                let payload = match value {
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(&payload))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// JSON object form of the whole mapping.
    pub fn to_json(&self) -> String {
        Value::Object(self.entries.clone()).to_string()
    }
}
