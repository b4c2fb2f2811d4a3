//! In-memory host document.
//!
//! `InMemoryDocument` emulates what a browser does behind `document.cookie`
//! for a single document, so the façade can run without a browser.
//!
//! ### Write semantics
//! - The fragment is `name=value` followed by `;`-separated attributes. A
//!   fragment whose first segment has no `=` is ignored.
//! - Attributes handled (case-insensitive): `Expires`, `Max-Age` (wins over
//!   `Expires`; `<= 0` deletes), `Path` (defaults to the directory of the
//!   location path), `Domain` (leading dot stripped, must domain-match the
//!   location host), `Secure` (a value of `false` leaves it off), `HttpOnly`
//!   and `SameSite`. `Priority`, `raw` and unknown attributes are accepted and
//!   ignored.
//! - Scripts cannot create `HttpOnly` cookies, and `Secure` cookies can only be
//!   written from an `https` location. Such writes are dropped.
//! - Cookies are identified by (name, domain, path). A write replaces the
//!   matching cookie in place, and an expiry in the past deletes it.
//!
//! ### Read semantics
//! The header lists cookies that domain- and path-match the current location,
//! are not expired, and are not `Secure` on a non-`https` location. Longer
//! paths come first, ties keep creation order.
//!
//! Every effective write fires a native change event into the change slot,
//! after all internal locks are released.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use time::{Duration, OffsetDateTime};
use url::Url;

use crate::cookies::parse_http_date;
use crate::events::{CookieListItem, EventTarget, NativeCookieChangeEvent};
use crate::host::{ChangeHandler, CookieChangeSource, CookieDocument, DocumentId};

/// DOM `Event.AT_TARGET`.
const AT_TARGET: u16 = 2;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    host_only: bool,
    path: String,
    expires: Option<OffsetDateTime>,
    secure: bool,
    same_site: Option<String>,
    /// Creation order, kept when a cookie is overwritten.
    seq: u64,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    fn same_identity(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    fn domain_matches(&self, host: &str) -> bool {
        if self.host_only {
            host == self.domain
        } else {
            domain_match(host, &self.domain)
        }
    }

    fn to_list_item(&self) -> CookieListItem {
        CookieListItem {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: (!self.host_only).then(|| self.domain.clone()),
            path: self.path.clone(),
            expires: self.expires.map(|at| at.unix_timestamp_nanos() as f64 / 1_000_000.0),
            secure: self.secure,
            same_site: self.same_site.clone(),
        }
    }
}

#[derive(Debug)]
struct DocumentState {
    location: Url,
    cookies: Vec<StoredCookie>,
    next_seq: u64,
}

/// What a single write did to the store.
enum WriteOutcome {
    Stored(StoredCookie),
    Deleted(StoredCookie),
    Ignored,
}

fn domain_match(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// RFC 6265 path-match.
fn path_match(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Directory of the location path, used when a write has no usable `Path`.
fn default_cookie_path(url: &Url) -> String {
    let path = url.path();
    if !path.starts_with('/') {
        return "/".to_string();
    }
    path.rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
        .to_string()
}

fn normalize_same_site(v: &str) -> String {
    if v.eq_ignore_ascii_case("lax") {
        "Lax".to_string()
    } else if v.eq_ignore_ascii_case("strict") {
        "Strict".to_string()
    } else if v.eq_ignore_ascii_case("none") {
        "None".to_string()
    } else {
        v.to_string()
    }
}

/// A single browser-like document with its own cookie store.
pub struct InMemoryDocument {
    id: DocumentId,
    created: Instant,
    state: Mutex<DocumentState>,
    onchange: RwLock<Option<ChangeHandler>>,
}

impl InMemoryDocument {
    /// Creates an empty document at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            id: DocumentId::new(),
            created: Instant::now(),
            state: Mutex::new(DocumentState {
                location,
                cookies: Vec::new(),
                next_seq: 0,
            }),
            onchange: RwLock::new(None),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn location(&self) -> Url {
        self.state().location.clone()
    }

    /// Navigates the document. Stored cookies are kept.
    pub fn set_location(&self, location: Url) {
        self.state().location = location;
    }

    /// Number of stored, unexpired cookies, including ones not visible from
    /// the current location.
    pub fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.state().cookies.iter().filter(|c| !c.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored, unexpired cookies in creation order.
    pub fn stored_cookies(&self) -> Vec<CookieListItem> {
        let now = OffsetDateTime::now_utc();
        self.state()
            .cookies
            .iter()
            .filter(|c| !c.is_expired(now))
            .map(StoredCookie::to_list_item)
            .collect()
    }

    /// Parses and applies one fragment to `state`.
    fn apply(state: &mut DocumentState, fragment: &str, now: OffsetDateTime) -> WriteOutcome {
        let host = match state.location.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return WriteOutcome::Ignored,
        };

        let mut segments = fragment.split(';');
        let Some((name, value)) = segments.next().and_then(|first| first.split_once('=')) else {
            log::debug!("ignoring cookie write without a name=value pair: {:?}", fragment);
            return WriteOutcome::Ignored;
        };

        let mut expires: Option<OffsetDateTime> = None;
        let mut max_age: Option<i64> = None;
        let mut path: Option<String> = None;
        let mut domain: Option<String> = None;
        let mut secure = false;
        let mut http_only = false;
        let mut same_site = None;

        for attr in segments {
            let attr = attr.trim();
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attr, None),
            };

            match key.to_ascii_lowercase().as_str() {
                "expires" => {
                    if let Some(at) = val.and_then(parse_http_date) {
                        expires = Some(at);
                    }
                }
                "max-age" => {
                    if let Some(secs) = val.and_then(|v| v.parse::<i64>().ok()) {
                        max_age = Some(secs);
                    }
                }
                "path" => path = val.filter(|v| v.starts_with('/')).map(str::to_string),
                "domain" => {
                    domain = val
                        .map(|v| v.trim_start_matches('.').to_ascii_lowercase())
                        .filter(|v| !v.is_empty());
                }
                "secure" => secure = !val.is_some_and(|v| v.eq_ignore_ascii_case("false")),
                "httponly" => http_only = true,
                "samesite" => same_site = val.map(normalize_same_site),
                _ => {}
            }
        }

        if http_only {
            log::debug!("ignoring script write of HttpOnly cookie {:?}", name.trim());
            return WriteOutcome::Ignored;
        }
        if secure && state.location.scheme() != "https" {
            log::debug!("ignoring Secure cookie {:?} written from a non-https location", name.trim());
            return WriteOutcome::Ignored;
        }

        let host_only = domain.is_none();
        let domain = match domain {
            Some(d) if domain_match(&host, &d) => d,
            Some(d) => {
                log::debug!("ignoring cookie {:?} for foreign domain {:?}", name.trim(), d);
                return WriteOutcome::Ignored;
            }
            None => host,
        };

        let expires = match max_age {
            Some(secs) if secs <= 0 => Some(OffsetDateTime::UNIX_EPOCH),
            // Out-of-range lifetimes never expire.
            Some(secs) => now.checked_add(Duration::seconds(secs)),
            None => expires,
        };

        let cookie = StoredCookie {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            domain,
            host_only,
            path: path.unwrap_or_else(|| default_cookie_path(&state.location)),
            expires,
            secure,
            same_site,
            seq: state.next_seq,
        };

        let existing = state.cookies.iter().position(|c| c.same_identity(&cookie));

        if cookie.is_expired(now) {
            return match existing {
                Some(idx) => WriteOutcome::Deleted(state.cookies.remove(idx)),
                None => WriteOutcome::Ignored,
            };
        }

        match existing {
            Some(idx) => {
                let seq = state.cookies[idx].seq;
                state.cookies[idx] = StoredCookie { seq, ..cookie };
                WriteOutcome::Stored(state.cookies[idx].clone())
            }
            None => {
                state.next_seq += 1;
                state.cookies.push(cookie.clone());
                WriteOutcome::Stored(cookie)
            }
        }
    }

    fn native_event(&self, changed: Vec<CookieListItem>, deleted: Vec<CookieListItem>) -> NativeCookieChangeEvent {
        let target = Some(EventTarget::CookieStore(self.id));
        NativeCookieChangeEvent {
            is_trusted: true,
            event_phase: AT_TARGET,
            time_stamp: Some(self.created.elapsed().as_secs_f64() * 1000.0),
            target,
            current_target: target,
            ..NativeCookieChangeEvent::new(changed, deleted)
        }
    }

    fn dispatch(&self, event: NativeCookieChangeEvent) {
        let handler = self
            .onchange
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(handler) = handler {
            handler(&event);
        }
    }
}

impl CookieDocument for InMemoryDocument {
    fn cookie(&self) -> String {
        let now = OffsetDateTime::now_utc();
        let state = self.state();

        let Some(host) = state.location.host_str().map(str::to_ascii_lowercase) else {
            return String::new();
        };
        let path = state.location.path();
        let is_https = state.location.scheme() == "https";

        let mut visible: Vec<&StoredCookie> = state
            .cookies
            .iter()
            .filter(|c| !c.is_expired(now))
            .filter(|c| c.domain_matches(&host))
            .filter(|c| path_match(path, &c.path))
            .filter(|c| !c.secure || is_https)
            .collect();

        visible.sort_by(|a, b| b.path.len().cmp(&a.path.len()).then(a.seq.cmp(&b.seq)));

        visible
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, fragment: &str) -> anyhow::Result<()> {
        let outcome = {
            let mut state = self.state();
            if state.location.host_str().is_none() {
                anyhow::bail!(
                    "cookies are not available for {} documents",
                    state.location.scheme()
                );
            }
            Self::apply(&mut state, fragment, OffsetDateTime::now_utc())
        };

        let event = match outcome {
            WriteOutcome::Stored(cookie) => self.native_event(vec![cookie.to_list_item()], vec![]),
            WriteOutcome::Deleted(cookie) => self.native_event(vec![], vec![cookie.to_list_item()]),
            WriteOutcome::Ignored => return Ok(()),
        };

        self.dispatch(event);
        Ok(())
    }

    fn location_path(&self) -> String {
        self.state().location.path().to_string()
    }
}

impl CookieChangeSource for InMemoryDocument {
    fn set_onchange(&self, handler: Option<ChangeHandler>) {
        *self.onchange.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    fn has_onchange(&self) -> bool {
        self.onchange.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn doc(s: &str) -> InMemoryDocument {
        InMemoryDocument::new(Url::parse(s).expect("valid URL"))
    }

    fn recorder(doc: &InMemoryDocument) -> Arc<Mutex<Vec<NativeCookieChangeEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        doc.set_onchange(Some(Arc::new(move |ev: &NativeCookieChangeEvent| {
            sink.lock().unwrap().push(ev.clone());
        })));
        seen
    }

    #[test]
    fn writes_merge_with_existing_cookies() {
        let d = doc("https://example.com/");
        d.set_cookie("a=1").unwrap();
        d.set_cookie("b=two").unwrap();
        d.set_cookie("a=3").unwrap();
        assert_eq!(d.cookie(), "a=3; b=two");
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn value_keeps_equals_and_is_trimmed() {
        let d = doc("https://example.com/");
        d.set_cookie(" t = abc== ;path=/").unwrap();
        assert_eq!(d.cookie(), "t=abc==");
    }

    #[test]
    fn fragment_without_pair_is_ignored() {
        let d = doc("https://example.com/");
        d.set_cookie("HttpOnly").unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn max_age_zero_and_past_expiry_delete() {
        let d = doc("https://example.com/");
        d.set_cookie("a=1;path=/").unwrap();
        d.set_cookie("b=2;path=/").unwrap();

        d.set_cookie("a=;max-age=0;path=/").unwrap();
        assert_eq!(d.cookie(), "b=2");

        d.set_cookie("b=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/").unwrap();
        assert_eq!(d.cookie(), "");
    }

    #[test]
    fn max_age_wins_over_expires() {
        let d = doc("https://example.com/");
        d.set_cookie("a=1;expires=Thu, 01 Jan 1970 00:00:00 GMT;max-age=60").unwrap();
        assert_eq!(d.cookie(), "a=1");
        let item = &d.stored_cookies()[0];
        assert!(item.expires.is_some());
    }

    #[test]
    fn removal_needs_matching_path() {
        let d = doc("https://example.com/app/page");
        d.set_cookie("a=1;path=/app/page").unwrap();
        d.set_cookie("a=;max-age=0;path=/").unwrap();
        assert_eq!(d.cookie(), "a=1");
        d.set_cookie("a=;max-age=0;path=/app/page").unwrap();
        assert_eq!(d.cookie(), "");
    }

    #[test]
    fn path_scoping_and_ordering() {
        let d = doc("https://example.com/app/page");
        d.set_cookie("root=1;path=/").unwrap();
        d.set_cookie("deep=2;path=/app").unwrap();
        d.set_cookie("other=3;path=/elsewhere").unwrap();
        d.set_cookie("prefix=4;path=/ap").unwrap();
        assert_eq!(d.cookie(), "deep=2; root=1");

        d.set_location(Url::parse("https://example.com/elsewhere").unwrap());
        assert_eq!(d.cookie(), "other=3; root=1");
    }

    #[test]
    fn default_path_is_location_directory() {
        let d = doc("https://example.com/app/page");
        d.set_cookie("a=1").unwrap();
        assert_eq!(d.stored_cookies()[0].path, "/app");

        let d = doc("https://example.com/page");
        d.set_cookie("a=1;path=relative").unwrap();
        assert_eq!(d.stored_cookies()[0].path, "/");
    }

    #[test]
    fn domain_attribute_must_match_host() {
        let d = doc("https://www.example.com/");
        d.set_cookie("a=1;domain=.example.com").unwrap();
        d.set_cookie("b=2;domain=evil.test").unwrap();
        assert_eq!(d.cookie(), "a=1");
        assert_eq!(d.stored_cookies()[0].domain.as_deref(), Some("example.com"));

        d.set_location(Url::parse("https://api.example.com/").unwrap());
        assert_eq!(d.cookie(), "a=1");
    }

    #[test]
    fn host_only_cookie_stays_on_its_host() {
        let d = doc("https://www.example.com/");
        d.set_cookie("a=1").unwrap();
        d.set_location(Url::parse("https://api.example.com/").unwrap());
        assert_eq!(d.cookie(), "");
    }

    #[test]
    fn secure_rules() {
        let d = doc("http://example.com/");
        d.set_cookie("a=1;secure=true").unwrap();
        d.set_cookie("b=2;secure=false").unwrap();
        assert_eq!(d.cookie(), "b=2");

        let d = doc("https://example.com/");
        d.set_cookie("a=1;Secure").unwrap();
        assert_eq!(d.cookie(), "a=1");
        d.set_location(Url::parse("http://example.com/").unwrap());
        assert_eq!(d.cookie(), "");
    }

    #[test]
    fn script_cannot_write_http_only() {
        let d = doc("https://example.com/");
        d.set_cookie("a=1;HttpOnly").unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        let d = doc("https://example.com/");
        d.set_cookie("a=1;path=/;SameSite=lax;Priority=High;raw").unwrap();
        assert_eq!(d.cookie(), "a=1");
        assert_eq!(d.stored_cookies()[0].same_site.as_deref(), Some("Lax"));
    }

    #[test]
    fn opaque_location_rejects_writes() {
        let d = doc("data:text/plain,hello");
        assert!(d.set_cookie("a=1").is_err());
        assert_eq!(d.cookie(), "");
    }

    #[test]
    fn fires_changed_and_deleted_events() {
        let d = doc("https://example.com/");
        let seen = recorder(&d);

        d.set_cookie("a=1;path=/").unwrap();
        d.set_cookie("a=;max-age=0;path=/").unwrap();
        // nothing to delete: no event
        d.set_cookie("a=;max-age=0;path=/").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].changed[0].name, "a");
        assert_eq!(seen[0].changed[0].value, "1");
        assert!(seen[0].deleted.is_empty());
        assert_eq!(seen[1].deleted[0].name, "a");
        assert!(seen[0].is_trusted);
        assert_eq!(seen[0].event_phase, AT_TARGET);
        assert_eq!(seen[0].target, Some(EventTarget::CookieStore(d.id())));
    }

    #[test]
    fn handler_may_read_cookies_reentrantly() {
        let d = Arc::new(doc("https://example.com/"));
        let seen = Arc::new(Mutex::new(String::new()));
        let (weak, sink) = (Arc::downgrade(&d), seen.clone());
        d.set_onchange(Some(Arc::new(move |_ev: &NativeCookieChangeEvent| {
            if let Some(d) = weak.upgrade() {
                *sink.lock().unwrap() = d.cookie();
            }
        })));

        d.set_cookie("a=1").unwrap();
        assert_eq!(*seen.lock().unwrap(), "a=1");
    }

    #[test]
    fn clearing_the_slot() {
        let d = doc("https://example.com/");
        let _seen = recorder(&d);
        assert!(d.has_onchange());
        d.set_onchange(None);
        assert!(!d.has_onchange());
    }

    #[test]
    fn path_match_rules() {
        assert!(path_match("/", "/"));
        assert!(path_match("/a/b", "/a"));
        assert!(path_match("/a/b", "/a/"));
        assert!(!path_match("/ab", "/a"));
        assert!(!path_match("/", "/a"));
    }
}
