//! Write path: turning a [`CookieWrite`] into a cookie header fragment.
//!
//! Fragment grammar, attributes in this order:
//!
//! ```text
//! name=value[;max-age=N|;expires=DATE];path=P[;domain=D][;secure=S][;HttpOnly][;SameSite=V][;Priority=V][;raw]
//! ```
//!
//! Nothing here touches the host. The façade hands the fragment to the host
//! document, and the mirror only sees the effect on its next rebuild.

use std::fmt;

use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Formats `at` as an HTTP date in GMT.
pub fn http_date(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    utc.format(HTTP_DATE).unwrap_or_else(|_| EPOCH_HTTP_DATE.to_string())
}

/// Parses an HTTP date (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn parse_http_date(s: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(s.trim(), HTTP_DATE).ok().map(PrimitiveDateTime::assume_utc)
}

/// Expiry attribute of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// Written as `expires=<date>`; the text is passed through as-is.
    At(String),
    /// Written as `max-age=<seconds>`.
    MaxAge(i64),
}

impl From<i64> for Expiry {
    fn from(seconds: i64) -> Self {
        Expiry::MaxAge(seconds)
    }
}

impl From<&str> for Expiry {
    fn from(date: &str) -> Self {
        Expiry::At(date.to_string())
    }
}

impl From<String> for Expiry {
    fn from(date: String) -> Self {
        Expiry::At(date)
    }
}

impl From<OffsetDateTime> for Expiry {
    fn from(at: OffsetDateTime) -> Self {
        Expiry::At(http_date(at))
    }
}

/// SameSite policy (`"Strict"`, `"Lax"` or `"None"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Priority hint (`"Low"`, `"Medium"` or `"High"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

/// Strings that read back as themselves can be written without JSON quoting.
fn is_verbatim_safe(s: &str) -> bool {
    s.trim() == s
        && !s.chars().any(|ch| ch == ';' || ch.is_control())
        && serde_json::from_str::<Value>(s).is_err()
}

/// Encodes a value as cookie-value text.
///
/// Plain strings that cannot be mistaken for JSON are written verbatim. All
/// other values are written as compact JSON with `;` escaped as `\u003b`, so
/// the mirror decodes them back to an equal value.
pub fn encode_cookie_value(value: &Value) -> String {
    match value {
        Value::String(s) if is_verbatim_safe(s) => s.clone(),
        // ';' only ever occurs inside JSON strings, where the escape is valid.
        other => other.to_string().replace(';', "\\u003b"),
    }
}

/// A written fragment: the leading `name=value` pair and the full header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieFragment {
    pub primary: String,
    pub header: String,
}

/// Everything needed to write one cookie. Used only to build a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieWrite {
    pub name: String,
    pub value: Value,
    pub expires: Option<Expiry>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub priority: Option<Priority>,
    pub raw: bool,
}

impl CookieWrite {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            path: None,
            domain: None,
            secure: None,
            http_only: false,
            same_site: None,
            priority: None,
            raw: false,
        }
    }

    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieWrite)) -> Self {
        f(&mut self);
        self
    }

    pub fn expiry(self, expiry: impl Into<Expiry>) -> Self { self.map(|w| w.expires = Some(expiry.into())) }
    pub fn expires<S: Into<String>>(self, date: S) -> Self { self.map(|w| w.expires = Some(Expiry::At(date.into()))) }
    pub fn expires_at(self, at: OffsetDateTime) -> Self { self.map(|w| w.expires = Some(at.into())) }
    pub fn max_age(self, seconds: i64) -> Self { self.map(|w| w.expires = Some(Expiry::MaxAge(seconds))) }
    pub fn path<S: Into<String>>(self, path: S) -> Self { self.map(|w| w.path = Some(path.into())) }
    pub fn domain<S: Into<String>>(self, domain: S) -> Self { self.map(|w| w.domain = Some(domain.into())) }
    pub fn secure(self, on: bool) -> Self { self.map(|w| w.secure = Some(on)) }
    pub fn http_only(self, on: bool) -> Self { self.map(|w| w.http_only = on) }
    pub fn same_site(self, policy: SameSite) -> Self { self.map(|w| w.same_site = Some(policy)) }
    pub fn priority(self, priority: Priority) -> Self { self.map(|w| w.priority = Some(priority)) }
    pub fn raw(self, on: bool) -> Self { self.map(|w| w.raw = on) }

    /// Builds the header fragment. An omitted or empty path becomes `default_path`.
    pub fn to_fragment(&self, default_path: &str) -> CookieFragment {
        let primary = format!("{}={}", self.name, encode_cookie_value(&self.value));
        let mut parts = vec![primary.clone()];

        match &self.expires {
            Some(Expiry::MaxAge(seconds)) => parts.push(format!("max-age={seconds}")),
            Some(Expiry::At(date)) => parts.push(format!("expires={date}")),
            None => {}
        }

        let path = self.path.as_deref().filter(|p| !p.is_empty()).unwrap_or(default_path);
        parts.push(format!("path={path}"));

        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("domain={domain}"));
        }
        if let Some(secure) = self.secure {
            parts.push(format!("secure={secure}"));
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(policy) = self.same_site {
            parts.push(format!("SameSite={policy}"));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("Priority={priority}"));
        }
        if self.raw {
            parts.push("raw".to_string());
        }

        CookieFragment { primary, header: parts.join(";") }
    }
}

/// Fragment that expires `name` immediately.
pub fn removal_fragment(name: &str, path: &str, domain: Option<&str>) -> String {
    let mut parts = vec![
        format!("{name}="),
        format!("expires={EPOCH_HTTP_DATE}"),
        format!("path={path}"),
    ];
    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        parts.push(format!("domain={domain}"));
    }
    parts.join(";")
}
