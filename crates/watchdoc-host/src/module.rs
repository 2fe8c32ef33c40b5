//! The watcher as a host module.
//!
//! The host drives three lifecycle calls, in order:
//!
//! 1. [`WatchDoctor::provision`] allocates the supervisor and the log span.
//! 2. [`WatchDoctor::validate`] runs the notification pre-flight and starts the
//!    watchers. A failure here keeps the module from becoming active.
//! 3. [`WatchDoctor::cleanup`] stops the watchers. It is fine to call it when
//!    `validate` never succeeded, or never ran.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, Instrument, Span};

use watchdoc_core::{Notifier, Prober, Supervisor, Target, WatchConfig, WatchError};

use crate::layer::PassThroughLayer;

pub const DEFAULT_MODULE_NAME: &str = "watch_doctor";

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module '{0}' used before provision")]
    NotProvisioned(String),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

pub struct WatchDoctor {
    name: String,
    config: WatchConfig,
    prober: Option<Arc<dyn Prober>>,
    notifier: Option<Arc<dyn Notifier>>,
    supervisor: Option<Supervisor>,
    span: Span,
}

impl WatchDoctor {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            name: DEFAULT_MODULE_NAME.to_string(),
            config,
            prober: None,
            notifier: None,
            supervisor: None,
            span: Span::none(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn supervisor(&self) -> Option<&Supervisor> {
        self.supervisor.as_ref()
    }

    pub fn provision(&mut self) {
        self.span = info_span!("watchdoc", module = %self.name);
        let _entered = self.span.enter();

        let mut supervisor = Supervisor::new(self.config.clone());
        if let Some(prober) = &self.prober {
            supervisor = supervisor.with_prober(Arc::clone(prober));
        }
        if let Some(notifier) = &self.notifier {
            supervisor = supervisor.with_notifier(Arc::clone(notifier));
        }
        self.supervisor = Some(supervisor);

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            timeout_ms = self.config.timeout.as_millis() as u64,
            notification_server = %self.config.notification_endpoint,
            servers = ?self.config.targets.iter().map(Target::as_str).collect::<Vec<_>>(),
            "Provisioned"
        );
    }

    pub async fn validate(&self) -> Result<(), ModuleError> {
        let supervisor = self
            .supervisor
            .as_ref()
            .ok_or_else(|| ModuleError::NotProvisioned(self.name.clone()))?;
        supervisor.start().instrument(self.span.clone()).await?;
        Ok(())
    }

    /// Returns the number of watchers that were signalled.
    pub async fn cleanup(&self) -> usize {
        match &self.supervisor {
            Some(supervisor) => supervisor.stop().instrument(self.span.clone()).await,
            None => 0,
        }
    }

    /// The middleware this module contributes to the host's chain.
    pub fn layer(&self) -> PassThroughLayer {
        PassThroughLayer::new(self.name.clone())
    }
}
