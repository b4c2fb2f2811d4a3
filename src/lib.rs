//! Client-side cookie access for a host document.
//!
//! The crate mirrors a document's cookie header (`document.cookie`) into a
//! parsed name → value mapping and offers a small façade over it:
//!
//! - [`DocumentCookies`]: `set`, `remove`/`delete`, `clear`, `has`, `get`,
//!   `get_all`, `serialize`, `to_json`, `parse` and `on`.
//! - [`cookies`]: the header parser/serializer ([`CookieMirror`]) and the write
//!   path ([`CookieWrite`]).
//! - [`events`]: normalized cookie change events.
//! - [`host`]: the host capabilities ([`Window`], [`CookieDocument`],
//!   [`CookieChangeSource`]) and a browser-like [`InMemoryDocument`].

pub mod config;
pub mod cookies;
pub mod document_cookies;
pub mod errors;
pub mod events;
pub mod host;

pub use config::{CookieConfig, CookieConfigBuilder, CookieConfigError};
pub use cookies::{CookieMap, CookieMirror, CookieSnapshot, CookieWrite, Expiry, Priority, SameSite};
pub use document_cookies::{DocumentCookies, VERSION};
pub use errors::CookieError;
pub use events::{ChangeListener, CookieChangeEvent, CookieEventKind, CookieListItem, NativeCookieChangeEvent};
pub use host::{CookieChangeSource, CookieDocument, InMemoryDocument, Window};
