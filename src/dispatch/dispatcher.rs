//! The per-request state machine.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use url::Url;
use uuid::Uuid;

use crate::config::DevConfig;
use crate::errors::{PipelineError, RepairableError, StackRepairer};
use crate::hooks::amp::{validation_hook, AmpValidator};
use crate::hooks::{sequence, ErrorEvent, ExternalFetch, HookError, Hooks, RequestEvent};
use crate::manifest::{ManifestCell, RouteManifest};
use crate::modules::ModuleLoader;
use crate::render::{
    AssetServer, ErrorSink, RenderContext, RenderEngine, RuntimePaths, TemplateLoader,
};

use super::body::BodyParser;

/// The external collaborators the dispatcher delegates to.
pub struct Collaborators {
    pub loader: Arc<dyn ModuleLoader>,
    pub engine: Arc<dyn RenderEngine>,
    pub assets: Arc<dyn AssetServer>,
    pub template: Arc<dyn TemplateLoader>,
    pub body_parser: Arc<dyn BodyParser>,
    pub repairer: Arc<dyn StackRepairer>,
    /// Ambient fetch backing the `externalFetch` hook default.
    pub fetch: ExternalFetch,
    /// Present when AMP support is enabled.
    pub amp: Option<Arc<dyn AmpValidator>>,
}

/// Sequences one request through short-circuits, hooks and rendering.
pub struct Dispatcher {
    config: Arc<DevConfig>,
    manifest: Arc<ManifestCell>,
    collab: Collaborators,
}

impl Dispatcher {
    pub fn new(config: Arc<DevConfig>, manifest: Arc<ManifestCell>, collab: Collaborators) -> Self {
        Self {
            config,
            manifest,
            collab,
        }
    }

    pub fn manifest(&self) -> &Arc<ManifestCell> {
        &self.manifest
    }

    /// Process one request to completion. Never panics; anything uncaught
    /// becomes a 500 carrying the repaired stack trace.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let request_id = Uuid::new_v4();
        // One snapshot per request; a concurrent rebuild cannot tear us.
        let snapshot = self.manifest.load();

        match self.try_dispatch(request, &snapshot, request_id).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(request_id = %request_id, error = %err, "request failed");
                plain(StatusCode::INTERNAL_SERVER_ERROR, self.error_body(&err))
            }
        }
    }

    /// Development-mode diagnostic: the response body is the stack trace.
    fn error_body(&self, err: &PipelineError) -> String {
        match err {
            PipelineError::Thrown(thrown) => {
                let wrapped =
                    RepairableError::new(thrown.clone(), Arc::clone(&self.collab.repairer));
                format!("{}\n{}", wrapped.message(), wrapped.stack())
            }
            other => other.to_string(),
        }
    }

    async fn try_dispatch(
        &self,
        request: Request<Body>,
        manifest: &Arc<RouteManifest>,
        request_id: Uuid,
    ) -> Result<Response<Body>, PipelineError> {
        // 1. Validate the transport-level request.
        if request.uri().path().is_empty() {
            return Ok(plain(StatusCode::BAD_REQUEST, "malformed request target"));
        }
        let host = match request
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
        {
            Some(host) => host.to_string(),
            None => return Ok(plain(StatusCode::BAD_REQUEST, "missing host header")),
        };

        // 2. Decode the path and build the absolute URL.
        let decoded = match percent_decode_str(request.uri().path()).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return Ok(plain(StatusCode::BAD_REQUEST, "malformed percent-encoding")),
        };
        let absolute = match request.uri().query() {
            Some(query) => format!("http://{host}{}?{query}", request.uri().path()),
            None => format!("http://{host}{}", request.uri().path()),
        };
        let url = match Url::parse(&absolute) {
            Ok(url) => url,
            Err(_) => return Ok(plain(StatusCode::BAD_REQUEST, "malformed request URL")),
        };

        tracing::debug!(request_id = %request_id, method = %request.method(), path = %decoded, "dispatching");

        // 3. Static asset short-circuit.
        if let Some(file) = self.asset_candidate(&decoded).await {
            tracing::debug!(request_id = %request_id, file = ?file, "delegating to asset server");
            return Ok(self.collab.assets.serve(request, &file).await);
        }

        // 4. Favicon short-circuit.
        if decoded == "/favicon.ico" {
            return Ok(plain(StatusCode::NOT_FOUND, "Not found"));
        }

        // 5. Base-path check.
        if !under_base(&decoded, &self.config.paths.base) {
            return Ok(plain(StatusCode::NOT_FOUND, "Not found"));
        }

        // 6–7. Resolve hooks, rejecting retired export names.
        let hooks = Arc::new(self.resolve_hooks().await?);

        // 8. Runtime paths travel with this request only.
        let paths = RuntimePaths {
            base: self.config.paths.base.clone(),
            assets: self.config.assets_path().to_string(),
        };

        // 9. Parse the body via the request adapter.
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, self.config.body_limit).await {
            Ok(bytes) => bytes,
            Err(err) => {
                return Ok(plain(
                    StatusCode::BAD_REQUEST,
                    format!("could not read request body: {err}"),
                ))
            }
        };
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let parsed = match self.collab.body_parser.parse(content_type, &bytes) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(request_id = %request_id, reason = %err.reason, "body parse failed");
                return Ok(plain(err.status, err.reason));
            }
        };

        // 10. Render through the hook chain; the final resolve invokes
        // the engine.
        let event = RequestEvent {
            method: parts.method,
            url,
            headers: parts.headers,
            body: parsed,
        };
        let ctx = self.render_context(manifest, &hooks, paths)?;

        let engine = Arc::clone(&self.collab.engine);
        let resolve_ctx = ctx.clone();
        let resolve: crate::hooks::Resolve = Arc::new(move |event| {
            let engine = Arc::clone(&engine);
            let ctx = resolve_ctx.clone();
            Box::pin(async move {
                engine.respond(event, ctx).await.map_err(|err| match err {
                    crate::render::EngineError::Thrown(thrown) => HookError::Thrown(thrown),
                    crate::render::EngineError::Failed(reason) => HookError::Failed(reason),
                })
            })
        });

        let rendered = (hooks.handle)(event, resolve).await.map_err(|err| match err {
            HookError::Thrown(thrown) => PipelineError::Thrown(thrown),
            HookError::Retired(message) => PipelineError::RetiredApi(message),
            HookError::Failed(reason) => PipelineError::Engine(reason),
        })?;

        // 11. Respond, falling back to 404 when nothing rendered.
        Ok(match rendered {
            Some(response) => response.into_http(),
            None => plain(StatusCode::NOT_FOUND, "Not found"),
        })
    }

    /// The on-disk file backing an asset path, if it exists and is not a
    /// directory.
    async fn asset_candidate(&self, decoded: &str) -> Option<PathBuf> {
        let prefix = self.config.assets_path();
        let relative = decoded.strip_prefix(prefix)?.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|seg| seg == "..") {
            return None;
        }

        let candidate = self
            .config
            .files
            .root
            .join(&self.config.files.assets)
            .join(relative);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if !meta.is_dir() => Some(candidate),
            _ => None,
        }
    }

    /// Load the user's hooks module when present, default every hook,
    /// and pre-compose the AMP hook when configured.
    async fn resolve_hooks(&self) -> Result<Hooks, PipelineError> {
        let hooks_file = self.config.files.root.join(&self.config.files.hooks);
        let module = if tokio::fs::metadata(&hooks_file).await.is_ok() {
            let url = hooks_file.to_string_lossy().into_owned();
            Some(self.collab.loader.resolve(&url).await?)
        } else {
            None
        };

        let mut hooks = Hooks::resolve(module.as_ref(), Arc::clone(&self.collab.fetch))?;
        if let Some(validator) = &self.collab.amp {
            hooks.handle = sequence(validation_hook(Arc::clone(validator)), hooks.handle);
        }
        Ok(hooks)
    }

    fn render_context(
        &self,
        manifest: &Arc<RouteManifest>,
        hooks: &Arc<Hooks>,
        paths: RuntimePaths,
    ) -> Result<RenderContext, PipelineError> {
        let template = self.collab.template.load()?;

        let assets_root = self.config.files.root.join(&self.config.files.assets);
        let read: crate::render::ReadAsset =
            Arc::new(move |file| std::fs::read(assets_root.join(file.trim_start_matches('/'))));

        let repairer = Arc::clone(&self.collab.repairer);
        let error_hook = Arc::clone(&hooks.handle_error);
        let sink_repairer = Arc::clone(&repairer);
        let on_error: ErrorSink = Arc::new(move |thrown, event| {
            let wrapped = Arc::new(RepairableError::new(thrown, Arc::clone(&sink_repairer)));
            error_hook(&ErrorEvent::new(wrapped, event.clone()));
        });

        Ok(RenderContext {
            manifest: Arc::clone(manifest),
            hooks: Arc::clone(hooks),
            paths,
            template,
            read,
            repairer,
            on_error,
        })
    }
}

/// True when `path` lies at or under the configured base path.
fn under_base(path: &str, base: &str) -> bool {
    if base.is_empty() {
        return true;
    }
    path == base || path.starts_with(&format!("{base}/"))
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body.into()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
