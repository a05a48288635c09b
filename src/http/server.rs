//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router that funnels every path into the dispatcher
//! - Wire up middleware (request id, tracing, request timeout)
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::DevConfig;
use crate::dispatch::Dispatcher;

/// HTTP server for the development pipeline.
pub struct DevServer {
    router: Router,
}

impl DevServer {
    /// Create a server around a dispatcher.
    pub fn new(config: &DevConfig, dispatcher: Arc<Dispatcher>) -> Self {
        // Layers wrap outside-in: the id is assigned before tracing and
        // echoed back on the response.
        let router = Router::new()
            .route("/{*path}", any(handle))
            .route("/", any(handle))
            .with_state(dispatcher)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self { router }
    }

    /// The router, for in-process testing without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "dev server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("dev server stopped");
        Ok(())
    }
}

/// Every path, every method: the dispatcher decides.
async fn handle(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
