use crate::config::CookieConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("a window with a document is required")]
    MissingDocument,

    #[error("host has no cookie change notification channel")]
    ChangeEventsUnavailable,

    #[error("Invalid cookie configuration: {0}")]
    InvalidConfig(#[from] CookieConfigError),
}
