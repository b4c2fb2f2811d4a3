//! The cookie façade.
//!
//! [`DocumentCookies`] is the public operation set over a host document's
//! cookie header. It owns a private [`CookieMirror`] and treats the host as the
//! only source of truth: **every** public operation first rebuilds the mirror
//! from the host's current header, then reads from it or writes a fragment
//! back to the host.
//!
//! The mirror is a snapshot. Writes are not reflected in it until the next
//! operation rebuilds it, which is why [`DocumentCookies::remove`] returns the
//! state as it stood *before* the removal.
//!
//! # Concurrency model
//! Operations run to completion on the calling thread. There is no locking
//! across calls, so callers that need an atomic read-modify-write sequence
//! must serialize their own calls. Change listeners run on the host's dispatch
//! path without any façade lock held, and may call back into the façade.
//!
//! ```rust
//! use gosub_cookie_mirror::{CookieWrite, DocumentCookies, Window};
//! use serde_json::json;
//!
//! let (window, _doc) = Window::in_memory("https://example.com/".parse().unwrap());
//! let cookies = DocumentCookies::new(&window).unwrap();
//!
//! cookies.set(CookieWrite::new("prefs", json!({"theme": "dark"})));
//! assert_eq!(cookies.get("prefs"), Some(json!({"theme": "dark"})));
//! ```

use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::config::CookieConfig;
use crate::cookies::{removal_fragment, CookieMap, CookieMirror, CookieSnapshot, CookieWrite};
use crate::errors::CookieError;
use crate::events::{ChangeListener, CookieChangeEvent, CookieEventKind, NativeCookieChangeEvent};
use crate::host::{CookieChangeSource, CookieDocument, Window};

/// Crate version, exposed the way the façade reports itself.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Inner {
    document: Arc<dyn CookieDocument>,
    cookie_store: Option<Arc<dyn CookieChangeSource>>,
    config: CookieConfig,
    mirror: Mutex<CookieMirror>,
}

/// Read/write access to one document's cookies.
///
/// Cloning is cheap and clones share the same mirror. Separate façades built
/// with [`DocumentCookies::new`] each own their own mirror.
#[derive(Clone)]
pub struct DocumentCookies {
    inner: Arc<Inner>,
}

impl Debug for DocumentCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCookies")
            .field("config", &self.inner.config)
            .field("entries", &self.mirror().len())
            .field("change_events", &self.has_change_events())
            .finish_non_exhaustive()
    }
}

/// Percent-decodes a cookie name, keeping it as-is when it is not valid.
fn decode_name(name: &str) -> String {
    urlencoding::decode(name)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| name.to_string())
}

impl DocumentCookies {
    /// Creates a façade over `window` with the default configuration.
    ///
    /// Fails with [`CookieError::MissingDocument`] when the window has no
    /// document.
    pub fn new(window: &Window) -> Result<Self, CookieError> {
        Self::with_config(window, CookieConfig::default())
    }

    /// Creates a façade over `window` with `config`.
    pub fn with_config(window: &Window, config: CookieConfig) -> Result<Self, CookieError> {
        config.validate()?;
        let document = window.document().cloned().ok_or(CookieError::MissingDocument)?;

        let cookies = Self {
            inner: Arc::new(Inner {
                document,
                cookie_store: window.cookie_store().cloned(),
                mirror: Mutex::new(CookieMirror::new(config.decode_json)),
                config,
            }),
        };

        let segments = cookies.load();
        log::debug!("cookie façade ready, {} segments in document cookie", segments);
        Ok(cookies)
    }

    fn mirror(&self) -> MutexGuard<'_, CookieMirror> {
        self.inner.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path used when a write or removal does not name one.
    fn default_path(&self) -> String {
        match &self.inner.config.default_path {
            Some(path) => path.clone(),
            None => self.inner.document.location_path(),
        }
    }

    /// Hands one fragment to the host. Host failures are logged, not raised.
    fn write_fragment(&self, fragment: &str) {
        log::debug!("writing cookie fragment: {}", fragment);
        if let Err(e) = self.inner.document.set_cookie(fragment) {
            log::warn!("host rejected cookie fragment {:?}: {}", fragment, e);
        }
    }

    pub fn config(&self) -> &CookieConfig {
        &self.inner.config
    }

    /// Rebuilds the mirror from the host's current cookie header.
    ///
    /// Returns the number of header segments seen, dropped ones included.
    pub fn load(&self) -> usize {
        let header = self.inner.document.cookie();
        self.mirror().rebuild(&header)
    }

    /// Segment count of the most recent rebuild.
    pub fn last_segment_count(&self) -> usize {
        self.mirror().last_segment_count()
    }

    /// Returns `true` when a cookie called `name` (percent-decoded) exists.
    pub fn has(&self, name: &str) -> bool {
        self.load();
        self.mirror().contains(&decode_name(name))
    }

    /// Returns the decoded value of `name`, or `None` when it does not exist.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.load();
        self.mirror().get(&decode_name(name)).cloned()
    }

    /// Flat, tagged snapshot of every cookie.
    pub fn get_all(&self) -> CookieSnapshot {
        self.load();
        CookieSnapshot::new(self.mirror().entries().clone())
    }

    /// The parsed mapping itself (untagged copy).
    pub fn parse(&self) -> CookieMap {
        self.load();
        self.mirror().entries().clone()
    }

    /// Writes a cookie. Returns the leading `name=value` fragment written.
    ///
    /// The path defaults to the configured default path, or else the current
    /// location path.
    pub fn set(&self, write: CookieWrite) -> String {
        self.load();
        let fragment = write.to_fragment(&self.default_path());
        self.write_fragment(&fragment.header);
        fragment.primary
    }

    /// Expires `name` immediately.
    ///
    /// Returns the cookies as they stood before the removal; the removal shows
    /// up on the next rebuild. `path` follows the same default as [`set`](Self::set).
    pub fn remove(&self, name: &str, path: Option<&str>, domain: Option<&str>) -> CookieSnapshot {
        self.load();
        let before = CookieSnapshot::new(self.mirror().entries().clone());

        let path = match path.filter(|p| !p.is_empty()) {
            Some(path) => path.to_string(),
            None => self.default_path(),
        };
        self.write_fragment(&removal_fragment(name, &path, domain));
        before
    }

    /// Alias of [`remove`](Self::remove).
    pub fn delete(&self, name: &str, path: Option<&str>, domain: Option<&str>) -> CookieSnapshot {
        self.remove(name, path, domain)
    }

    /// Removes every currently known cookie, one at a time, with the default
    /// path. Returns the cookies left after a final rebuild, which includes
    /// any cookie scoped to a different path or domain.
    pub fn clear(&self) -> CookieSnapshot {
        self.load();
        let names = self.mirror().names();
        for name in names {
            self.remove(&name, None, None);
        }
        self.get_all()
    }

    /// Query-string form: `enc(name)=enc(json(value))` joined by `&`.
    pub fn serialize(&self) -> String {
        self.load();
        self.mirror().serialize()
    }

    /// JSON object form of every cookie.
    pub fn to_json(&self) -> String {
        self.load();
        self.mirror().to_json()
    }

    /// Returns `true` when the host has a change notification channel.
    pub fn has_change_events(&self) -> bool {
        self.inner.cookie_store.is_some()
    }

    /// Registers `listener` for change events.
    ///
    /// The façade owns one slot in the host's channel; registering again
    /// replaces the previous listener. The listener is called with this façade
    /// and the normalized event. Once every clone of the façade is dropped the
    /// installed handler does nothing.
    ///
    /// Fails with [`CookieError::ChangeEventsUnavailable`] when the host has no
    /// change channel.
    pub fn on<L>(&self, kind: CookieEventKind, listener: L) -> Result<(), CookieError>
    where
        L: ChangeListener + 'static,
    {
        let store = self
            .inner
            .cookie_store
            .as_ref()
            .ok_or(CookieError::ChangeEventsUnavailable)?;

        let listener: Arc<dyn ChangeListener> = Arc::new(listener);
        let weak = Arc::downgrade(&self.inner);

        store.set_onchange(Some(Arc::new(move |native: &NativeCookieChangeEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let cookies = DocumentCookies { inner };
            let event = CookieChangeEvent::from_native(native);
            listener.on_change(&cookies, &event);
        })));

        log::debug!("registered cookie {} listener", kind);
        Ok(())
    }
}
