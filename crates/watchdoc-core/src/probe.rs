use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::target::Target;

/// Outcome of a single liveness probe.
///
/// Refusals, timeouts and resolution failures all collapse into
/// [`ProbeResult::Unreachable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Healthy,
    Unreachable,
}

impl ProbeResult {
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

/// Trait for checking whether a target accepts connections.
///
/// Object-safe and Send + Sync so one prober can be shared by every watch task.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult;
}

/// Probes by opening a TCP connection and dropping it straight away.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        match tokio::time::timeout(timeout, TcpStream::connect(target.as_str())).await {
            Ok(Ok(_stream)) => ProbeResult::Healthy,
            Ok(Err(e)) => {
                debug!(server = %target, error = %e, "Connect failed");
                ProbeResult::Unreachable
            }
            Err(_) => {
                debug!(
                    server = %target,
                    timeout_ms = timeout.as_millis() as u64,
                    "Connect timed out"
                );
                ProbeResult::Unreachable
            }
        }
    }
}
