//! Cookie façade configuration.
//!
//! `CookieConfig` controls how a [`DocumentCookies`](crate::DocumentCookies)
//! instance fills in defaults on the write path and how it decodes values on
//! the read path.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_cookie_mirror::CookieConfig;
//! let cfg = CookieConfig::default();
//! assert!(cfg.decode_json);
//! assert!(cfg.default_path.is_none());
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_cookie_mirror::CookieConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = CookieConfig::builder()
//!     .default_path("/app")
//!     .decode_json(false)
//!     .build()?; // returns Result<CookieConfig, CookieConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `default_path`: path written when a `set`/`remove` call omits one. `None`
//!   falls back to the host's current location path.
//! - `decode_json`: decode cookie values as JSON when possible (default: `true`).
//!   When `false` every value is kept as its raw string.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub default_path: Option<String>,
    pub decode_json: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            default_path: None,
            decode_json: true,
        }
    }
}

impl CookieConfig {
    pub fn builder() -> CookieConfigBuilder {
        CookieConfigBuilder::default()
    }

    /// Checks a config that was assembled by hand instead of through the builder.
    pub fn validate(&self) -> Result<(), CookieConfigError> {
        validate(self)
    }
}

/// Builder for [`CookieConfig`].
#[derive(Debug, Clone, Default)]
pub struct CookieConfigBuilder {
    inner: CookieConfig,
}

impl CookieConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn default_path<S: Into<String>>(self, path: S) -> Self { self.map(|c| c.default_path = Some(path.into())) }
    pub fn decode_json(self, on: bool) -> Self { self.map(|c| c.decode_json = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut CookieConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<CookieConfig, CookieConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieConfigError {
    EmptyDefaultPath,
    RelativeDefaultPath(String),
    ControlCharInDefaultPath(String),
}

impl fmt::Display for CookieConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieConfigError::EmptyDefaultPath =>
                write!(f, "default_path must not be empty"),
            CookieConfigError::RelativeDefaultPath(p) =>
                write!(f, "default_path {p:?} must start with '/'"),
            CookieConfigError::ControlCharInDefaultPath(p) =>
                write!(f, "default_path {p:?} contains ';' or a control character"),
        }
    }
}
impl std::error::Error for CookieConfigError {}

fn validate(c: &CookieConfig) -> Result<(), CookieConfigError> {
    if let Some(path) = &c.default_path {
        if path.is_empty() {
            return Err(CookieConfigError::EmptyDefaultPath);
        }
        if !path.starts_with('/') {
            return Err(CookieConfigError::RelativeDefaultPath(path.clone()));
        }
        // A ';' would start a new attribute in the written fragment.
        if path.chars().any(|ch| ch == ';' || ch.is_control()) {
            return Err(CookieConfigError::ControlCharInDefaultPath(path.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_decode_json_without_path_override() {
        let cfg = CookieConfig::default();
        assert_eq!(cfg.default_path, None);
        assert!(cfg.decode_json);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_applies_settings() {
        let cfg = CookieConfig::builder()
            .default_path("/shop")
            .decode_json(false)
            .build()
            .unwrap();

        assert_eq!(cfg.default_path.as_deref(), Some("/shop"));
        assert!(!cfg.decode_json);
    }

    #[test]
    fn builder_with_closure() {
        let cfg = CookieConfig::builder()
            .with(|c| {
                c.default_path = Some("/".into());
                c.decode_json = false;
            })
            .build()
            .unwrap();
        assert_eq!(cfg.default_path.as_deref(), Some("/"));
    }

    #[test]
    fn rejects_bad_default_paths() {
        let err = CookieConfig::builder().default_path("").build().unwrap_err();
        assert_eq!(err, CookieConfigError::EmptyDefaultPath);

        let err = CookieConfig::builder().default_path("app").build().unwrap_err();
        assert_eq!(err, CookieConfigError::RelativeDefaultPath("app".into()));

        let err = CookieConfig::builder().default_path("/a;domain=evil").build().unwrap_err();
        assert!(matches!(err, CookieConfigError::ControlCharInDefaultPath(_)));
        assert!(err.to_string().contains("/a;domain=evil"));
    }

    #[test]
    fn hand_built_config_is_validated() {
        let cfg = CookieConfig { default_path: Some("nope".into()), decode_json: true };
        assert!(cfg.validate().is_err());
    }
}
