use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace};

use crate::config::WatchConfig;
use crate::notifier::Notifier;
use crate::probe::{ProbeResult, Prober};
use crate::target::Target;
use crate::watch::state::WatchState;

/// The periodic check loop for one target.
///
/// Waits for the interval or a stop signal, whichever comes first. On each
/// elapsed interval the target is probed and, if unreachable, reported. The
/// timer is re-armed after the cycle finishes, so a slow probe or notification
/// pushes the next check back rather than overlapping it.
pub struct WatchTask {
    target: Target,
    interval: Duration,
    timeout: Duration,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    stop_rx: mpsc::Receiver<()>,
    state: WatchState,
}

impl WatchTask {
    pub fn new(
        target: Target,
        config: &WatchConfig,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        stop_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            target,
            interval: config.interval,
            timeout: config.timeout,
            prober,
            notifier,
            stop_rx,
            state: WatchState::Running,
        }
    }

    /// Run until a stop signal arrives or the stop slot is closed.
    pub async fn run(mut self) -> WatchState {
        debug!(server = %self.target, interval_ms = self.interval.as_millis() as u64, "Watcher started");

        while self.state == WatchState::Running {
            tokio::select! {
                _ = self.stop_rx.recv() => {
                    // A closed slot means the owner is gone; treat it as a stop.
                    self.state = WatchState::Stopped;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.check().await;
                }
            }
        }

        debug!(server = %self.target, state = %self.state, "Watcher exited");
        self.state
    }

    async fn check(&self) {
        match self.prober.probe(&self.target, self.timeout).await {
            ProbeResult::Healthy => {
                trace!(server = %self.target, "Target healthy");
            }
            ProbeResult::Unreachable => {
                self.notifier.notify_down(&self.target, Utc::now()).await;
            }
        }
    }
}

/// A running [`WatchTask`] together with its stop slot.
///
/// The slot is a channel of depth one, so a stop signal can be left in it even
/// when the task has not reached its first wait point yet.
pub struct WatchHandle {
    target: Target,
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<WatchState>,
}

impl WatchHandle {
    pub fn spawn(
        target: Target,
        config: &WatchConfig,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let task = WatchTask::new(target.clone(), config, prober, notifier, stop_rx);
        let task = tokio::spawn(task.run());
        Self {
            target,
            stop_tx,
            task,
        }
    }

    /// Leave a stop signal in the slot. Never blocks.
    ///
    /// Returns false when the slot already holds a signal or the task is gone;
    /// either way the task will not start another cycle.
    pub fn signal_stop(&self) -> bool {
        match self.stop_tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                trace!(server = %self.target, "Stop signal already pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                trace!(server = %self.target, "Watcher already exited");
                false
            }
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Give up the handle and wait for the task to exit.
    pub async fn join(self) -> WatchState {
        self.task.await.unwrap_or(WatchState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProber {
        result: ProbeResult,
        probes: AtomicUsize,
    }

    #[async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _target: &Target, _timeout: Duration) -> ProbeResult {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify_down(&self, _target: &Target, _time_checked: DateTime<Utc>) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> WatchConfig {
        WatchConfig::new("alerts:9000")
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_millis(100))
    }

    fn prober(result: ProbeResult) -> Arc<CountingProber> {
        Arc::new(CountingProber {
            result,
            probes: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn buffered_stop_before_first_wait() {
        let prober = prober(ProbeResult::Unreachable);
        let notifier = Arc::new(CountingNotifier::default());
        let (tx, rx) = mpsc::channel(1);
        let task = WatchTask::new(
            Target::parse("svc:80").unwrap(),
            &config(),
            prober.clone(),
            notifier.clone(),
            rx,
        );

        tx.try_send(()).unwrap();
        assert_eq!(task.run().await, WatchState::Stopped);
        assert_eq!(prober.probes.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_slot_stops_the_task() {
        let prober = prober(ProbeResult::Healthy);
        let (tx, rx) = mpsc::channel(1);
        let task = WatchTask::new(
            Target::parse("svc:80").unwrap(),
            &config(),
            prober,
            Arc::new(CountingNotifier::default()),
            rx,
        );
        drop(tx);
        assert_eq!(task.run().await, WatchState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_target_is_not_reported() {
        let prober = prober(ProbeResult::Healthy);
        let notifier = Arc::new(CountingNotifier::default());
        let handle = WatchHandle::spawn(
            Target::parse("svc:80").unwrap(),
            &config(),
            prober.clone(),
            notifier.clone(),
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(handle.signal_stop());
        assert_eq!(handle.join().await, WatchState::Stopped);

        assert_eq!(prober.probes.load(Ordering::SeqCst), 3);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_stop_signal_does_not_block() {
        let handle = WatchHandle::spawn(
            Target::parse("svc:80").unwrap(),
            &config(),
            prober(ProbeResult::Healthy),
            Arc::new(CountingNotifier::default()),
        );

        assert!(handle.signal_stop());
        // Either still pending in the slot or the task already consumed it and exited.
        handle.signal_stop();
        handle.signal_stop();
        assert_eq!(handle.join().await, WatchState::Stopped);
    }
}
