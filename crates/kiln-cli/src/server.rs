//! HTTP adapter: axum in front of the engine's [`DevServer`].
//!
//! Every route falls back to [`handle_request`], which turns the axum
//! request into an engine [`Request`](kiln_engine::Request) and writes the
//! engine's response back unchanged.

use crate::error::{CliError, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header::HOST, StatusCode},
    response::Response,
    Router,
};
use kiln_engine::DevServer;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use url::Url;

/// Build the router serving `engine`.
pub fn router(engine: Arc<DevServer>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(engine)
}

/// Resolve one request through the engine.
pub async fn handle_request(
    State(engine): State<Arc<DevServer>>,
    request: axum::extract::Request,
) -> Response {
    let started = Instant::now();
    let (parts, _body) = request.into_parts();

    let host = parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let url = match Url::parse(&format!("http://{host}{path}")) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(uri = %parts.uri, "rejecting request: {err}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    let mut engine_request = kiln_engine::Request::new(parts.method.clone(), url);
    engine_request.headers = parts.headers;
    let engine_response = engine.load(&engine_request).await;

    tracing::info!(
        "{} {} {} {}ms",
        parts.method,
        parts.uri.path(),
        engine_response.status.as_u16(),
        started.elapsed().as_millis()
    );

    let mut response = Response::new(Body::from(engine_response.body));
    *response.status_mut() = engine_response.status;
    *response.headers_mut() = engine_response.headers;
    response
}

fn status_only(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Bind `host:port` and serve until `shutdown` completes.
pub async fn serve<F>(engine: Arc<DevServer>, host: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to {}:{}: {}", host, port, e)))?;
    let addr = listener.local_addr()?;

    crate::ui::success(&format!("Development server running at http://{}", addr));

    serve_listener(listener, engine, shutdown).await
}

/// Serve on an already bound listener until `shutdown` completes.
pub async fn serve_listener<F>(listener: TcpListener, engine: Arc<DevServer>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CliError::Server(format!("Server error: {}", e)))
}
