pub mod app;
pub mod layer;
pub mod module;

use std::future::Future;
use std::net::SocketAddr;

use tracing::error;

use crate::app::build_app;

pub use layer::{PassThrough, PassThroughLayer};
pub use module::{ModuleError, WatchDoctor, DEFAULT_MODULE_NAME};

/// Run the host with `module` loaded: provision and validate it, serve until
/// `shutdown` resolves, then clean it up.
pub async fn serve_with_module(
    addr: SocketAddr,
    mut module: WatchDoctor,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    module.provision();
    module.validate().await?;

    let app = build_app(&module);
    let served: std::io::Result<()> = async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
    .await;

    module.cleanup().await;
    served?;
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
