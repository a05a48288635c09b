//! Shared mock collaborators for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, Response, StatusCode};

use vellum_dev::dispatch::{Collaborators, DefaultBodyParser};
use vellum_dev::errors::{StackRepairer, ThrownError};
use vellum_dev::hooks::{ExternalFetch, HookError, HookExports, RequestEvent};
use vellum_dev::modules::{LoadError, ModuleExports, ModuleLoader, ModuleNode};
use vellum_dev::render::{
    AssetServer, EngineError, RenderContext, RenderEngine, RenderedResponse, TemplateLoader,
};

/// In-memory module loader with a mutable module graph.
#[derive(Default)]
pub struct MemoryLoader {
    modules: Mutex<HashMap<String, ModuleExports>>,
    nodes: Mutex<HashMap<String, Arc<ModuleNode>>>,
    pub resolved: Mutex<Vec<String>>,
}

impl MemoryLoader {
    pub fn insert_module(&self, url: &str, module: ModuleExports) {
        self.modules.lock().unwrap().insert(url.to_string(), module);
    }

    pub fn insert_node(&self, node: Arc<ModuleNode>) {
        self.nodes
            .lock()
            .unwrap()
            .insert(node.url.clone(), node);
    }

    pub fn resolved_urls(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleLoader for MemoryLoader {
    async fn resolve(&self, url: &str) -> Result<ModuleExports, LoadError> {
        self.resolved.lock().unwrap().push(url.to_string());
        self.modules
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }

    fn node_by_url(&self, url: &str) -> Option<Arc<ModuleNode>> {
        self.nodes.lock().unwrap().get(url).cloned()
    }
}

/// Render engine that matches against the manifest snapshot and renders a
/// plain-text summary of the matched route.
pub struct ManifestEngine {
    /// Records every event that reached the engine.
    pub rendered: Mutex<Vec<String>>,
}

impl ManifestEngine {
    pub fn new() -> Self {
        Self {
            rendered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RenderEngine for ManifestEngine {
    async fn respond(
        &self,
        event: RequestEvent,
        ctx: RenderContext,
    ) -> Result<Option<RenderedResponse>, EngineError> {
        let path = event.url.path();
        let routable = path
            .strip_prefix(ctx.paths.base.as_str())
            .filter(|rest| rest.starts_with('/') || rest.is_empty())
            .map(|rest| if rest.is_empty() { "/" } else { rest })
            .unwrap_or(path);

        self.rendered.lock().unwrap().push(routable.to_string());

        let matched = match ctx.manifest.find(routable) {
            Some(matched) => matched,
            None => return Ok(None),
        };

        let mut params: Vec<String> = matched
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        params.sort();

        let mut style_count = 0;
        if let vellum_dev::manifest::RouteEntry::Page(page) = matched.entry {
            for index in &page.a {
                if *index >= 0 {
                    // Tests without a registered component module still render.
                    if let Ok(node) = (ctx.manifest.nodes[*index as usize])().await {
                        style_count += node.styles.len();
                    }
                }
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "text/plain; charset=utf-8".parse().unwrap(),
        );
        Ok(Some(RenderedResponse {
            status: StatusCode::OK,
            headers,
            body: format!(
                "route={} params=[{}] styles={}",
                matched.entry.key(),
                params.join(","),
                style_count
            )
            .into_bytes(),
        }))
    }
}

/// Engine that always throws an application error.
pub struct ThrowingEngine;

#[async_trait]
impl RenderEngine for ThrowingEngine {
    async fn respond(
        &self,
        _event: RequestEvent,
        _ctx: RenderContext,
    ) -> Result<Option<RenderedResponse>, EngineError> {
        Err(EngineError::Thrown(ThrownError::new(
            "template exploded",
            "at render (generated.rs:10:5)",
        )))
    }
}

/// Asset server that marks its responses so tests can prove delegation.
pub struct MarkingAssetServer;

#[async_trait]
impl AssetServer for MarkingAssetServer {
    async fn serve(&self, _request: Request<Body>, file: &Path) -> Response<Body> {
        let bytes = tokio::fs::read(file).await.unwrap_or_default();
        Response::builder()
            .status(StatusCode::OK)
            .header("x-asset-server", "hit")
            .body(Body::from(bytes))
            .unwrap()
    }
}

/// Fixed-string template loader.
pub struct StaticTemplate(pub &'static str);

impl TemplateLoader for StaticTemplate {
    fn load(&self) -> std::io::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Repairer that marks its output so tests can detect it ran.
pub struct MarkingRepairer;

impl StackRepairer for MarkingRepairer {
    fn repair(&self, stack: &str) -> String {
        format!("repaired|{stack}")
    }
}

pub fn noop_fetch() -> ExternalFetch {
    Arc::new(|url| {
        Box::pin(async move { Err(HookError::Failed(format!("no ambient fetch for {url}"))) })
    })
}

/// A hooks module whose `handle` records invocations before resolving.
pub fn recording_hooks_module(log: Arc<Mutex<Vec<String>>>) -> ModuleExports {
    let handle: vellum_dev::hooks::Handle = Arc::new(
        move |event: RequestEvent, resolve: vellum_dev::hooks::Resolve| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push(event.url.path().to_string());
                resolve(event).await
            }) as futures_util::future::BoxFuture<'static, vellum_dev::hooks::HookResult>
        },
    );

    ModuleExports {
        names: ["handle".to_string()].into_iter().collect(),
        hooks: Some(HookExports {
            handle: Some(handle),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Collaborators wired around the given loader and engine.
pub fn collaborators(
    loader: Arc<MemoryLoader>,
    engine: Arc<dyn RenderEngine>,
) -> Collaborators {
    Collaborators {
        loader,
        engine,
        assets: Arc::new(MarkingAssetServer),
        template: Arc::new(StaticTemplate("<html>%body%</html>")),
        body_parser: Arc::new(DefaultBodyParser),
        repairer: Arc::new(MarkingRepairer),
        fetch: noop_fetch(),
        amp: None,
    }
}
