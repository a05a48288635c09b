//! Render engine boundary and per-request context.
//!
//! # Responsibilities
//! - Define the collaborator traits the dispatcher delegates to: render
//!   engine, static asset server, template loader
//! - Assemble the per-request `RenderContext`
//!
//! # Design Decisions
//! - Runtime paths travel inside the context, one copy per request; there
//!   is no process-global path state to reconfigure between requests
//! - The engine reports application errors as `EngineError::Thrown` so
//!   the dispatcher can wrap them in the lazy stack adapter

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use thiserror::Error;

use crate::errors::{StackRepairer, ThrownError};
use crate::hooks::{Hooks, RequestEvent};
use crate::manifest::RouteManifest;

/// A fully rendered response, before conversion to the transport type.
#[derive(Debug, Clone)]
pub struct RenderedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RenderedResponse {
    pub fn into_http(self) -> Response<Body> {
        let mut builder = Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

/// Base and assets path prefixes threaded through each request.
#[derive(Debug, Clone, Default)]
pub struct RuntimePaths {
    pub base: String,
    pub assets: String,
}

/// Reads an asset file relative to the static assets directory.
pub type ReadAsset = Arc<dyn Fn(&str) -> std::io::Result<Vec<u8>> + Send + Sync>;

/// Funnel for application errors the engine catches itself. The
/// dispatcher wires this to stack repair plus the `handleError` hook.
pub type ErrorSink = Arc<dyn Fn(ThrownError, &RequestEvent) + Send + Sync>;

/// Everything the render engine needs for one request.
#[derive(Clone)]
pub struct RenderContext {
    pub manifest: Arc<RouteManifest>,
    pub hooks: Arc<Hooks>,
    pub paths: RuntimePaths,
    pub template: String,
    pub read: ReadAsset,
    pub repairer: Arc<dyn StackRepairer>,
    pub on_error: ErrorSink,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// An error thrown by application code while rendering.
    #[error("{}", .0.message)]
    Thrown(ThrownError),

    #[error("{0}")]
    Failed(String),
}

/// External render engine collaborator.
///
/// Returns `None` when no route produced output; the dispatcher turns
/// that into a 404.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn respond(
        &self,
        event: RequestEvent,
        ctx: RenderContext,
    ) -> Result<Option<RenderedResponse>, EngineError>;
}

/// External static asset server collaborator. Owns the full response for
/// any asset path whose file exists.
#[async_trait]
pub trait AssetServer: Send + Sync {
    async fn serve(&self, request: Request<Body>, file: &Path) -> Response<Body>;
}

/// On-disk template loader collaborator. Read per request so edits to the
/// template show up without a restart.
pub trait TemplateLoader: Send + Sync {
    fn load(&self) -> std::io::Result<String>;
}

/// Loads the template from a fixed path.
pub struct FileTemplate {
    path: std::path::PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemplateLoader for FileTemplate {
    fn load(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}
