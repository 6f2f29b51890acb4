//! Serves the dispatcher over plain HTTP for local development.
//!
//! Every request goes through the same routing as a Lambda invocation; the
//! axum layer only translates between HTTP and envelopes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use product_core::ProductStore;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch;
use crate::handlers::ProductService;
use crate::response::Envelope;

/// Build the router. `request_timeout` bounds whole requests, on top of the
/// per-call store timeout.
pub fn router<S: ProductStore + 'static>(
    service: Arc<ProductService<S>>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .fallback(proxy::<S>)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve<S: ProductStore + 'static>(
    service: ProductService<S>,
    addr: SocketAddr,
    request_timeout: Duration,
) -> std::io::Result<()> {
    let app = router(Arc::new(service), request_timeout);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn proxy<S: ProductStore + 'static>(
    State(service): State<Arc<ProductService<S>>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Envelope {
    let body = (!body.is_empty()).then_some(body);
    dispatch::route(&service, method.as_str(), uri.path(), &query, body.as_deref()).await
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.into_parts();
        let mut response = match body {
            Some(body) => (status, body).into_response(),
            None => status.into_response(),
        };
        response.headers_mut().extend(headers);
        response
    }
}
