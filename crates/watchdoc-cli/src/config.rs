//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [watch]
//! interval = "5s"
//! timeout = "2s"
//! notification_server = "http://alerts.internal:9000/hooks/down"
//! servers = "https://api.internal:8443 http://db.internal:5432"
//! ```
//!
//! `servers` may also be written as an array of strings.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use watchdoc_core::{WatchConfig, WatchError};
use watchdoc_host::DEFAULT_MODULE_NAME;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub watch: WatchDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchDef {
    #[serde(default = "default_name")]
    pub name: String,
    pub interval: String,
    pub timeout: String,
    pub notification_server: String,
    #[serde(default)]
    pub servers: ServersDef,
}

fn default_name() -> String {
    DEFAULT_MODULE_NAME.into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServersDef {
    Inline(String),
    List(Vec<String>),
}

impl Default for ServersDef {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ServersDef {
    fn joined(&self) -> String {
        match self {
            Self::Inline(s) => s.clone(),
            Self::List(v) => v.join(" "),
        }
    }
}

impl WatchDef {
    pub fn to_watch_config(&self) -> Result<WatchConfig, WatchError> {
        WatchConfig::from_directive(
            &self.interval,
            &self.timeout,
            &self.notification_server,
            &self.servers.joined(),
        )
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.watch.name.trim().is_empty() {
            return Err("Watch name must not be empty".into());
        }

        let watch = self
            .watch
            .to_watch_config()
            .map_err(|e| format!("Invalid [watch] section: {}", e))?;
        watch
            .validate()
            .map_err(|e| format!("Invalid [watch] section: {}", e))?;

        if watch.targets.is_empty() {
            return Err("No servers to watch".into());
        }

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}
