use thiserror::Error;

/// Errors that keep the watcher from starting.
///
/// Everything here is a configuration-time failure. Runtime problems (a target
/// going down, an alert that could not be delivered) are logged, never returned.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("No notification server given")]
    EmptyNotificationEndpoint,

    #[error("Invalid notification endpoint {endpoint}: {reason}")]
    InvalidNotificationEndpoint { endpoint: String, reason: String },

    #[error("Notification server unreachable at {endpoint}")]
    NotificationEndpointUnreachable { endpoint: String },

    #[error("Invalid {field} duration {value:?}: {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Target {value:?} is empty once the scheme is stripped")]
    EmptyTarget { value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Watchers are already running")]
    AlreadyStarted,
}

impl WatchError {
    /// True for errors that stem from the supplied configuration rather than
    /// from the order of lifecycle calls.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::AlreadyStarted)
    }
}
