//! Host environment: the document cookie string and the change channel.
//!
//! The façade never stores cookie state itself. Everything it knows comes from
//! a [`CookieDocument`] (the `document.cookie` getter/setter plus the current
//! location path), and change notifications come from an optional
//! [`CookieChangeSource`] with a single callback slot.
//!
//! A [`Window`] bundles both capabilities. A window without a document cannot
//! host a façade at all; a window without a cookie store simply has no change
//! events.
//!
//! [`InMemoryDocument`] implements both traits with browser-like semantics and
//! is what tests and non-browser embedders use.

mod in_memory;

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::events::NativeCookieChangeEvent;

pub use in_memory::InMemoryDocument;

/// Callback installed in a host's change slot.
pub type ChangeHandler = Arc<dyn Fn(&NativeCookieChangeEvent) + Send + Sync>;

/// A unique identifier for a host document, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The host's cookie header, as seen by scripts.
pub trait CookieDocument: Send + Sync {
    /// All cookies visible to the document as one `; `-joined string.
    fn cookie(&self) -> String;

    /// Writes one cookie header fragment. The host merges it into its store;
    /// unrelated cookies are left alone.
    fn set_cookie(&self, fragment: &str) -> anyhow::Result<()>;

    /// Path component of the document's current location.
    fn location_path(&self) -> String;
}

/// The host's native cookie change channel. It has exactly one callback slot.
pub trait CookieChangeSource: Send + Sync {
    /// Replaces the handler in the slot. `None` empties it.
    fn set_onchange(&self, handler: Option<ChangeHandler>);

    /// Returns `true` when a handler is installed.
    fn has_onchange(&self) -> bool;
}

/// The capabilities a façade is constructed against.
#[derive(Clone, Default)]
pub struct Window {
    document: Option<Arc<dyn CookieDocument>>,
    cookie_store: Option<Arc<dyn CookieChangeSource>>,
}

impl Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("document", &self.document.is_some())
            .field("cookie_store", &self.cookie_store.is_some())
            .finish()
    }
}

impl Window {
    /// A window with no capabilities at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: Arc<dyn CookieDocument>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_cookie_store(mut self, cookie_store: Arc<dyn CookieChangeSource>) -> Self {
        self.cookie_store = Some(cookie_store);
        self
    }

    /// A window backed by a fresh [`InMemoryDocument`] at `location`, used as
    /// both the document and the cookie store.
    pub fn in_memory(location: Url) -> (Self, Arc<InMemoryDocument>) {
        let doc = Arc::new(InMemoryDocument::new(location));
        let window = Self::new()
            .with_document(doc.clone())
            .with_cookie_store(doc.clone());
        (window, doc)
    }

    pub fn document(&self) -> Option<&Arc<dyn CookieDocument>> {
        self.document.as_ref()
    }

    pub fn cookie_store(&self) -> Option<&Arc<dyn CookieChangeSource>> {
        self.cookie_store.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid URL")
    }

    #[test]
    fn empty_window_has_nothing() {
        let w = Window::new();
        assert!(w.document().is_none());
        assert!(w.cookie_store().is_none());
        assert_eq!(format!("{:?}", w), "Window { document: false, cookie_store: false }");
    }

    #[test]
    fn in_memory_window_wires_both_slots() {
        let (w, doc) = Window::in_memory(url("https://example.com/a/b"));
        assert!(w.document().is_some());
        assert!(w.cookie_store().is_some());

        w.document().unwrap().set_cookie("k=v").unwrap();
        assert_eq!(doc.cookie(), "k=v");
        assert_eq!(w.document().unwrap().location_path(), "/a/b");
    }

    #[test]
    fn document_only_window() {
        let doc = Arc::new(InMemoryDocument::new(url("http://localhost/")));
        let w = Window::new().with_document(doc);
        assert!(w.document().is_some());
        assert!(w.cookie_store().is_none());
    }

    #[test]
    fn document_ids_are_unique() {
        assert_ne!(DocumentId::new(), DocumentId::new());
        let uuid = Uuid::new_v4();
        assert_eq!(DocumentId::from(uuid).to_string(), uuid.to_string());
    }
}
