//! Request pass-through.
//!
//! The watcher sits in the host's middleware chain but never looks at traffic:
//! every request goes to the next handler untouched, and its response comes back
//! untouched.

use std::task::{Context, Poll};

use axum::http::Request;
use tower::{Layer, Service};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct PassThroughLayer {
    module: String,
}

impl PassThroughLayer {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl<S> Layer<S> for PassThroughLayer {
    type Service = PassThrough<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PassThrough {
            inner,
            module: self.module.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PassThrough<S> {
    inner: S,
    module: String,
}

impl<S, B> Service<Request<B>> for PassThrough<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(module = %self.module, method = %req.method(), uri = %req.uri(), "Passing request through");
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn forwards_request_unchanged() {
        let inner = service_fn(|req: Request<String>| async move {
            let echoed = format!(
                "{} {} {} {}",
                req.method(),
                req.uri(),
                req.headers()["x-probe"].to_str().unwrap(),
                req.body()
            );
            Ok::<_, Infallible>(echoed)
        });
        let svc = PassThroughLayer::new("watch_doctor").layer(inner);

        let req = Request::builder()
            .method("PUT")
            .uri("/backend/items?id=7")
            .header("x-probe", "kept")
            .body("payload".to_string())
            .unwrap();
        let resp = svc.oneshot(req).await.unwrap();
        assert_eq!(resp, "PUT /backend/items?id=7 kept payload");
    }

    #[tokio::test]
    async fn forwards_inner_errors() {
        let inner = service_fn(|_req: Request<()>| async move { Err::<(), _>("upstream failed") });
        let svc = PassThroughLayer::new("watch_doctor").layer(inner);

        let err = svc.oneshot(Request::new(())).await.unwrap_err();
        assert_eq!(err, "upstream failed");
    }
}
