use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::module::WatchDoctor;

/// The host's router with the watcher's pass-through layer in its chain.
pub fn build_app(module: &WatchDoctor) -> Router {
    Router::new()
        .route("/health", get(health))
        .layer(module.layer())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}
