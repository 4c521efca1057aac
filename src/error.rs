//! The error taxonomy of §7: a single enum so the orchestrator's catch-and-log loop and the
//! remote client's backoff policy share one notion of what's transient.

/// Errors common to this crate.
#[derive(thiserror::Error, Debug)]
pub enum WaypointError {
    /// Network/timeout talking to the remote task service. Transient: the affected store's
    /// `synced` snapshot is left unchanged and the next tick retries.
    #[error("remote request failed: {0}")]
    Remote(String),

    /// 4xx with code 401/403. Fatal: logged, process exits.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 404 on a single-item fetch.
    #[error("not found: {0}")]
    NotFound(String),

    /// 429. Transient, retry with backoff.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<std::time::Duration> },

    /// 5xx. Transient, retry.
    #[error("remote server error: {0}")]
    RemoteServer(String),

    /// DB write/read failure. Propagates out of the tick; state advances only for what committed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A consistency assertion failed (e.g. "added task already in plan"). Never fatal: the
    /// particular task is skipped and this is logged as a warning.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Unparseable timestamp, missing required field, or similar. The item is skipped.
    #[error("format error: {0}")]
    Format(String),

    /// The notifier endpoint could not be reached. Logged and swallowed.
    #[error("notifier unreachable: {0}")]
    Notifier(String),
}

impl WaypointError {
    /// Distinguishes the transient cases from the fatal ones, so callers don't have to re-derive
    /// this from matching on error text.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            WaypointError::Remote(_) | WaypointError::RateLimited { .. } | WaypointError::RemoteServer(_)
        )
    }

    /// True for [`WaypointError::Auth`], the one variant that should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WaypointError::Auth(_))
    }
}

impl From<reqwest::Error> for WaypointError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return WaypointError::Remote(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                WaypointError::Auth(err.to_string())
            }
            Some(status) if status.as_u16() == 404 => WaypointError::NotFound(err.to_string()),
            Some(status) if status.as_u16() == 429 => WaypointError::RateLimited { retry_after: None },
            Some(status) if status.is_server_error() => WaypointError::RemoteServer(err.to_string()),
            _ => WaypointError::Remote(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for WaypointError {
    fn from(err: sqlx::Error) -> Self {
        WaypointError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WaypointError {
    fn from(err: serde_json::Error) -> Self {
        WaypointError::Format(err.to_string())
    }
}

impl From<chrono::ParseError> for WaypointError {
    fn from(err: chrono::ParseError) -> Self {
        WaypointError::Format(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WaypointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_family_is_retryable() {
        assert!(WaypointError::Remote("x".into()).retryable());
        assert!(WaypointError::RemoteServer("x".into()).retryable());
        assert!(WaypointError::RateLimited { retry_after: None }.retryable());
        assert!(!WaypointError::Auth("x".into()).retryable());
        assert!(!WaypointError::Storage("x".into()).retryable());
    }

    #[test]
    fn only_auth_is_fatal() {
        assert!(WaypointError::Auth("x".into()).is_fatal());
        assert!(!WaypointError::RemoteServer("x".into()).is_fatal());
    }
}
