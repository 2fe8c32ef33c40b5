#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod notifier;
pub mod probe;
pub mod target;
pub mod watch;

pub use config::{parse_duration, WatchConfig};
pub use error::WatchError;
pub use notifier::{DownNotification, HttpNotifier, NotificationKind, Notifier};
pub use probe::{ProbeResult, Prober, TcpProber};
pub use target::{parse_targets, NotificationEndpoint, Target};
pub use watch::{Supervisor, WatchHandle, WatchState, WatchTask};
