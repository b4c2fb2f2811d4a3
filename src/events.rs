//! Cookie change events.
//!
//! The host delivers a [`NativeCookieChangeEvent`] through its single change
//! callback slot. The façade wraps each one into a [`CookieChangeEvent`]: an
//! immutable value built once from the documented field set, which is then
//! handed to the registered [`ChangeListener`] together with the façade.
//!
//! Delivery happens on the host's own dispatch path. Ordering relative to a
//! `set`/`remove` call on the façade is not guaranteed.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::document_cookies::DocumentCookies;
use crate::host::DocumentId;

/// Event types a listener can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookieEventKind {
    /// One or more cookies were added, changed or deleted.
    Change,
}

impl CookieEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieEventKind::Change => "change",
        }
    }
}

impl Display for CookieEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cookie as reported in a change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieListItem {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    /// Expiry in milliseconds since the unix epoch. `None` for session cookies.
    pub expires: Option<f64>,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl CookieListItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            domain: None,
            path: "/".to_string(),
            expires: None,
            secure: false,
            same_site: None,
        }
    }
}

/// Reference to the object an event was dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    CookieStore(DocumentId),
}

/// Change notification as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCookieChangeEvent {
    pub event_type: String,
    pub changed: Vec<CookieListItem>,
    pub deleted: Vec<CookieListItem>,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub cancel_bubble: bool,
    pub is_trusted: bool,
    pub event_phase: u16,
    pub return_value: bool,
    pub default_prevented: bool,
    /// Host timestamp in milliseconds, if the host supplies one.
    pub time_stamp: Option<f64>,
    pub target: Option<EventTarget>,
    pub current_target: Option<EventTarget>,
    pub src_element: Option<EventTarget>,
}

impl NativeCookieChangeEvent {
    /// A `"change"` event with the given lists and everything else defaulted.
    pub fn new(changed: Vec<CookieListItem>, deleted: Vec<CookieListItem>) -> Self {
        Self {
            event_type: CookieEventKind::Change.as_str().to_string(),
            changed,
            deleted,
            bubbles: false,
            cancelable: false,
            composed: false,
            cancel_bubble: false,
            is_trusted: false,
            event_phase: 0,
            return_value: true,
            default_prevented: false,
            time_stamp: None,
            target: None,
            current_target: None,
            src_element: None,
        }
    }
}

fn now_millis() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1_000_000.0
}

/// Normalized change event handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieChangeEvent {
    kind: String,
    original_event: Option<NativeCookieChangeEvent>,
    target: Option<EventTarget>,
    current_target: Option<EventTarget>,
    src_element: Option<EventTarget>,
    time_stamp: f64,
}

impl CookieChangeEvent {
    /// Wraps a host event. A missing or zero host timestamp is replaced by
    /// the current wall-clock time in milliseconds.
    pub fn from_native(src: &NativeCookieChangeEvent) -> Self {
        let time_stamp = src
            .time_stamp
            .filter(|t| *t != 0.0 && !t.is_nan())
            .unwrap_or_else(now_millis);

        Self {
            kind: src.event_type.clone(),
            original_event: Some(src.clone()),
            target: src.target,
            current_target: src.current_target,
            src_element: src.src_element,
            time_stamp,
        }
    }

    /// A synthetic event of `kind` with no host event behind it.
    pub fn from_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            original_event: None,
            target: None,
            current_target: None,
            src_element: None,
            time_stamp: now_millis(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn original_event(&self) -> Option<&NativeCookieChangeEvent> {
        self.original_event.as_ref()
    }

    pub fn target(&self) -> Option<EventTarget> {
        self.target
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target
    }

    pub fn src_element(&self) -> Option<EventTarget> {
        self.src_element
    }

    pub fn time_stamp(&self) -> f64 {
        self.time_stamp
    }

    // Forwarded fields. Synthetic events report the defaults.

    pub fn changed(&self) -> &[CookieListItem] {
        self.original_event.as_ref().map(|e| e.changed.as_slice()).unwrap_or(&[])
    }

    pub fn deleted(&self) -> &[CookieListItem] {
        self.original_event.as_ref().map(|e| e.deleted.as_slice()).unwrap_or(&[])
    }

    pub fn bubbles(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.bubbles)
    }

    pub fn cancelable(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.cancelable)
    }

    pub fn composed(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.composed)
    }

    pub fn cancel_bubble(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.cancel_bubble)
    }

    pub fn is_trusted(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.is_trusted)
    }

    pub fn event_phase(&self) -> u16 {
        self.original_event.as_ref().map_or(0, |e| e.event_phase)
    }

    pub fn return_value(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.return_value)
    }

    pub fn default_prevented(&self) -> bool {
        self.original_event.as_ref().is_some_and(|e| e.default_prevented)
    }
}

/// Receives normalized change events together with the façade they belong to.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, cookies: &DocumentCookies, event: &CookieChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(&DocumentCookies, &CookieChangeEvent) + Send + Sync,
{
    fn on_change(&self, cookies: &DocumentCookies, event: &CookieChangeEvent) {
        self(cookies, event)
    }
}
