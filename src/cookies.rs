//! Cookies: the parsed [`CookieMirror`], [`CookieSnapshot`] and the write path.

mod mirror;
mod snapshot;
mod write;

pub use mirror::parse_cookie_header;
pub use mirror::CookieMirror;
pub use mirror::CookieMap;

pub use snapshot::CookieSnapshot;
pub use snapshot::SNAPSHOT_TAG;

pub use write::encode_cookie_value;
pub use write::http_date;
pub use write::parse_http_date;
pub use write::removal_fragment;
pub use write::CookieFragment;
pub use write::CookieWrite;
pub use write::Expiry;
pub use write::Priority;
pub use write::SameSite;
