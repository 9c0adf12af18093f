//! Failure taxonomy for the sync engine.
//!
//! Every engine operation returns exactly one of these; nothing is retried
//! internally. Only `RefreshFailed` carries a side effect: the stored session
//! is cleared before the error is returned, so a stale token is never offered
//! as valid again.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The user cancelled the authorization round trip.
    #[error("authorization was denied")]
    AuthorizationDenied,
    #[error("authorization failed: {0}")]
    AuthorizationError(String),
    /// The redirect arrived without a `code` parameter.
    #[error("authorization callback carried no code")]
    CallbackParseError,
    #[error("token exchange failed ({status}): {message}")]
    TokenExchangeFailed { status: u16, message: String },
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    /// No session at all: neither an OAuth grant nor a manual token is stored.
    #[error("not authorized; connect a workspace first")]
    NotAuthorized,
    #[error("workspace discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("no pages available to choose a parent from")]
    NoPagesAvailable,
    #[error("database creation failed: {0}")]
    DatabaseCreationFailed(String),
    #[error("auto-setup failed: {0}")]
    SetupFailed(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("invalid request url: {0}")]
    BadUrl(String),
    /// Transport-level failure before any HTTP status was received.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("settings store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("settings migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
