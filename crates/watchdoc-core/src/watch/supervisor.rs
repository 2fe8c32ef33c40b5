use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::notifier::{HttpNotifier, Notifier};
use crate::probe::{Prober, TcpProber};
use crate::target::Target;
use crate::watch::task::WatchHandle;

#[derive(Default)]
struct Registry {
    running: bool,
    watchers: HashMap<Target, WatchHandle>,
}

/// Owns one [`WatchHandle`] per target.
///
/// Dropping a supervisor closes every stop slot, which stops the tasks at
/// their next wait point.
pub struct Supervisor {
    config: WatchConfig,
    prober: Arc<dyn Prober>,
    notifier: Option<Arc<dyn Notifier>>,
    registry: Mutex<Registry>,
    starting: Mutex<()>,
}

impl Supervisor {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            prober: Arc::new(TcpProber),
            notifier: None,
            registry: Mutex::new(Registry::default()),
            starting: Mutex::new(()),
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    /// Use `notifier` instead of the HTTP notifier built from the config.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.registry.lock().await.running
    }

    /// Targets that currently have a watcher, sorted.
    pub async fn targets(&self) -> Vec<Target> {
        let registry = self.registry.lock().await;
        let mut targets: Vec<Target> = registry.watchers.keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Check the notification endpoint, then spawn one watcher per target.
    ///
    /// Nothing is spawned unless the endpoint is configured and answers a TCP
    /// connect within the probe timeout. A call that overlaps another `start`,
    /// or that comes while watchers are running, fails with
    /// [`WatchError::AlreadyStarted`].
    pub async fn start(&self) -> Result<(), WatchError> {
        let _starting = self
            .starting
            .try_lock()
            .map_err(|_| WatchError::AlreadyStarted)?;
        if self.registry.lock().await.running {
            return Err(WatchError::AlreadyStarted);
        }

        // The registry stays unlocked during the pre-flight so stop() and the
        // introspection calls never wait on it.
        let endpoint = self.config.validate().inspect_err(|e| {
            error!(error = %e, "Invalid watcher configuration");
        })?;

        let preflight = endpoint.probe_target();
        if !self
            .prober
            .probe(&preflight, self.config.timeout)
            .await
            .is_healthy()
        {
            error!(endpoint = %endpoint, address = %preflight, "Notification server unreachable");
            return Err(WatchError::NotificationEndpointUnreachable {
                endpoint: endpoint.to_string(),
            });
        }

        let notifier: Arc<dyn Notifier> = match &self.notifier {
            Some(n) => Arc::clone(n),
            None => Arc::new(HttpNotifier::new(&endpoint, self.config.timeout)?),
        };

        debug!("Setting up watchers for backend servers");
        let mut registry = self.registry.lock().await;
        for target in &self.config.targets {
            if registry.watchers.contains_key(target) {
                debug!(server = %target, "Target listed more than once, already watched");
                continue;
            }
            let handle = WatchHandle::spawn(
                target.clone(),
                &self.config,
                Arc::clone(&self.prober),
                Arc::clone(&notifier),
            );
            registry.watchers.insert(target.clone(), handle);
        }
        registry.running = true;

        info!(
            targets = registry.watchers.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            endpoint = %endpoint,
            "Watchers started"
        );
        Ok(())
    }

    /// Signal every watcher to stop and forget about it.
    ///
    /// Returns as soon as the signals are handed off, without waiting for the
    /// tasks to exit. Safe to call when nothing was started. Returns the number
    /// of watchers signalled.
    pub async fn stop(&self) -> usize {
        let handles = self.drain().await;
        let count = handles.len();
        if count > 0 {
            info!(count, "Watchers stopped");
        }
        count
    }

    /// Like [`stop`](Self::stop), then wait up to `grace` for the tasks to
    /// exit. Tasks still running after `grace` are aborted.
    pub async fn stop_and_wait(&self, grace: Duration) -> usize {
        let handles = self.drain().await;
        let count = handles.len();
        let aborts: Vec<_> = handles.iter().map(WatchHandle::abort_handle).collect();

        let joins = join_all(handles.into_iter().map(WatchHandle::join));
        if tokio::time::timeout(grace, joins).await.is_err() {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Watchers did not exit in time, aborting"
            );
            for abort in aborts {
                abort.abort();
            }
        }

        if count > 0 {
            info!(count, "Watchers stopped and drained");
        }
        count
    }

    async fn drain(&self) -> Vec<WatchHandle> {
        let mut registry = self.registry.lock().await;
        registry.running = false;
        registry
            .watchers
            .drain()
            .map(|(_, handle)| {
                handle.signal_stop();
                handle
            })
            .collect()
    }
}
