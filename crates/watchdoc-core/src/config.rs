use std::time::Duration;

use tracing::warn;

use crate::error::WatchError;
use crate::target::{parse_targets, NotificationEndpoint, Target};

/// Configuration for a watcher instance. Immutable once handed to a
/// [`Supervisor`](crate::watch::Supervisor).
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Time between two probes of the same target.
    pub interval: Duration,
    /// Budget for a single TCP connect, also used as the notification request timeout.
    pub timeout: Duration,
    /// URL (or bare `host:port`) that down notifications are POSTed to.
    pub notification_endpoint: String,
    /// Targets in source order. Duplicates are kept here and collapsed at spawn time.
    pub targets: Vec<Target>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(3),
            notification_endpoint: String::new(),
            targets: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub fn new(notification_endpoint: impl Into<String>) -> Self {
        Self::default().with_notification_endpoint(notification_endpoint)
    }

    /// Build a config from the textual directive form: two duration strings, the
    /// notification endpoint and a whitespace-separated server list.
    pub fn from_directive(
        interval: &str,
        timeout: &str,
        notification_endpoint: &str,
        servers: &str,
    ) -> Result<Self, WatchError> {
        Ok(Self {
            interval: parse_duration("interval", interval)?,
            timeout: parse_duration("timeout", timeout)?,
            notification_endpoint: notification_endpoint.trim().to_string(),
            targets: parse_targets(servers),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_notification_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.notification_endpoint = endpoint.into();
        self
    }

    /// Append raw target strings, normalizing each and dropping empty ones.
    pub fn with_targets<I, S>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.targets
            .extend(raw.into_iter().filter_map(|s| Target::parse(s.as_ref())));
        self
    }

    /// Check everything that can be checked without touching the network and
    /// return the parsed notification endpoint.
    pub fn validate(&self) -> Result<NotificationEndpoint, WatchError> {
        let endpoint = NotificationEndpoint::parse(&self.notification_endpoint)?;

        if self.interval.is_zero() {
            return Err(non_positive("interval"));
        }
        if self.timeout.is_zero() {
            return Err(non_positive("timeout"));
        }
        if self.timeout > self.interval {
            warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                interval_ms = self.interval.as_millis() as u64,
                "Probe timeout exceeds the probe interval"
            );
        }

        Ok(endpoint)
    }
}

fn non_positive(field: &'static str) -> WatchError {
    WatchError::InvalidDuration {
        field,
        value: "0s".into(),
        reason: "must be greater than zero".into(),
    }
}

/// Parse a duration such as `50ms`, `5s` or `2m`.
///
/// `field` names the setting in the returned error.
pub fn parse_duration(field: &'static str, value: &str) -> Result<Duration, WatchError> {
    let trimmed = value.trim();
    let duration = humantime::parse_duration(trimmed).map_err(|e| WatchError::InvalidDuration {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if duration.is_zero() {
        return Err(WatchError::InvalidDuration {
            field,
            value: value.to_string(),
            reason: "must be greater than zero".into(),
        });
    }

    Ok(duration)
}
