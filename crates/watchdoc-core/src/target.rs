//! Monitored targets and the notification endpoint.
//!
//! Targets are written in configuration the way people write backend URLs
//! (`https://api.internal:8443`), but they are probed at the transport layer, so
//! the scheme is stripped and the remaining `host:port` is the target's identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WatchError;

/// A normalized `host:port` address under liveness monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// Normalize a raw, URL-like string into a target.
    ///
    /// Returns `None` when nothing is left after trimming and stripping the
    /// `http://` or `https://` prefix.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let address = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim();

        if address.is_empty() {
            None
        } else {
            Some(Self(address.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Target {
    type Error = WatchError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or(WatchError::EmptyTarget { value: raw })
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a whitespace-separated server list and normalize every entry,
/// dropping the ones that end up empty. Order and duplicates are kept.
pub fn parse_targets(raw: &str) -> Vec<Target> {
    raw.split_whitespace().filter_map(Target::parse).collect()
}

/// Where down notifications are POSTed.
///
/// Accepts either a full URL or a bare `host:port`, in which case `http://` is
/// assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEndpoint {
    raw: String,
    url: Url,
}

impl NotificationEndpoint {
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WatchError::EmptyNotificationEndpoint);
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let invalid = |reason: String| WatchError::InvalidNotificationEndpoint {
            endpoint: raw.to_string(),
            reason,
        };

        let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".into()));
        }

        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    /// The endpoint as it was configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `host:port` the pre-flight check connects to.
    pub fn probe_target(&self) -> Target {
        let host = self.url.host_str().unwrap_or_default();
        let port = self.url.port_or_known_default().unwrap_or(80);
        Target(format!("{host}:{port}"))
    }
}

impl fmt::Display for NotificationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
