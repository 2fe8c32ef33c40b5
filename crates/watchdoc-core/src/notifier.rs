//! Down notifications.
//!
//! When a watch task finds its target unreachable it hands the target to a
//! [`Notifier`]. The [`HttpNotifier`] POSTs a small JSON document to the
//! configured endpoint, once, and logs whatever goes wrong. Nothing is retried
//! or queued: the next failed probe produces the next notification.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::WatchError;
use crate::target::{NotificationEndpoint, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Down,
}

/// The JSON body POSTed to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub server: Target,
    pub time_checked: DateTime<Utc>,
}

impl DownNotification {
    pub fn new(server: Target, time_checked: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Down,
            server,
            time_checked,
        }
    }
}

/// Delivers down notifications. Implementations must not fail the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_down(&self, target: &Target, time_checked: DateTime<Utc>);
}

/// Best-effort HTTP delivery of [`DownNotification`]s.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(endpoint: &NotificationEndpoint, timeout: Duration) -> Result<Self, WatchError> {
        Ok(Self::with_client(Self::build_client()?, endpoint, timeout))
    }

    pub fn with_client(client: Client, endpoint: &NotificationEndpoint, timeout: Duration) -> Self {
        Self {
            client,
            url: endpoint.url().clone(),
            timeout,
        }
    }

    pub fn build_client() -> Result<Client, WatchError> {
        Client::builder()
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| WatchError::HttpClient(e.to_string()))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn deliver(&self, server: &Target, body: Vec<u8>) {
        let result = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, concat!("watchdoc/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .body(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = %self.url, server = %server, "Notification delivered");
            }
            Ok(resp) => {
                warn!(
                    url = %self.url,
                    server = %server,
                    status = resp.status().as_u16(),
                    "Notification server answered with a non-success status"
                );
            }
            Err(e) => {
                error!(
                    url = %self.url,
                    server = %server,
                    error = %e,
                    "Error occurred during sending notification"
                );
            }
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify_down(&self, target: &Target, time_checked: DateTime<Utc>) {
        error!(server = %target, "Backend server down");

        let notification = DownNotification::new(target.clone(), time_checked);
        let body = match serde_json::to_vec(&notification) {
            Ok(b) => b,
            Err(e) => {
                error!(server = %target, error = %e, "Cannot serialize notification");
                return;
            }
        };

        self.deliver(target, body).await;
    }
}
