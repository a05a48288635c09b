//! Development server binary.
//!
//! Startup sequence: tracing init → config load and validation →
//! manifest build → route watcher + rebuild task → HTTP server with
//! graceful shutdown.
//!
//! The module loader and render engine here are in-memory placeholders
//! serving a two-route site (`/` and `/blog/[slug]`); embedders wire
//! real collaborators through the library crate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use tokio::net::TcpListener;

use vellum_dev::config::{load_config, DevConfig};
use vellum_dev::dispatch::{Collaborators, DefaultBodyParser, Dispatcher};
use vellum_dev::errors::IdentityRepairer;
use vellum_dev::hooks::{ExternalFetch, HookError, RequestEvent};
use vellum_dev::manifest::{
    build, spawn_rebuilder, BuilderPaths, ManifestCell, RouteDef, RouteTree, RouteTreeSource,
    RouteWatcher,
};
use vellum_dev::modules::{LoadError, ModuleExports, ModuleLoader, ModuleNode};
use vellum_dev::render::{
    AssetServer, EngineError, RenderContext, RenderEngine, RenderedResponse, TemplateLoader,
};

struct MemoryLoader {
    modules: Mutex<HashMap<String, ModuleExports>>,
}

#[async_trait]
impl ModuleLoader for MemoryLoader {
    async fn resolve(&self, url: &str) -> Result<ModuleExports, LoadError> {
        self.modules
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }

    fn node_by_url(&self, _url: &str) -> Option<Arc<ModuleNode>> {
        None
    }
}

struct TextEngine;

#[async_trait]
impl RenderEngine for TextEngine {
    async fn respond(
        &self,
        event: RequestEvent,
        ctx: RenderContext,
    ) -> Result<Option<RenderedResponse>, EngineError> {
        let matched = match ctx.manifest.find(event.url.path()) {
            Some(matched) => matched,
            None => return Ok(None),
        };

        let body = ctx.template.replace(
            "%body%",
            &format!("route {} params {:?}", matched.entry.key(), matched.params),
        );
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "text/html; charset=utf-8".parse().expect("static header"),
        );
        Ok(Some(RenderedResponse {
            status: StatusCode::OK,
            headers,
            body: body.into_bytes(),
        }))
    }
}

struct FsAssets;

#[async_trait]
impl AssetServer for FsAssets {
    async fn serve(&self, _request: Request<Body>, file: &Path) -> Response<Body> {
        match tokio::fs::read(file).await {
            Ok(bytes) => Response::builder()
                .status(StatusCode::OK)
                .body(Body::from(bytes))
                .expect("asset response"),
            Err(_) => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::empty())
                .expect("asset response"),
        }
    }
}

struct InlineTemplate;

impl TemplateLoader for InlineTemplate {
    fn load(&self) -> std::io::Result<String> {
        Ok("<!doctype html><body>%body%</body>".to_string())
    }
}

struct FixedTree;

impl RouteTreeSource for FixedTree {
    fn scan(&self) -> std::io::Result<RouteTree> {
        Ok(demo_tree())
    }
}

fn demo_tree() -> RouteTree {
    RouteTree {
        components: vec!["routes/index.vlm".to_string(), "routes/blog/[slug].vlm".to_string()],
        routes: vec![
            RouteDef::Page {
                id: String::new(),
                a: vec!["routes/index.vlm".to_string()],
                b: Vec::new(),
                shadow: None,
            },
            RouteDef::Page {
                id: "blog/[slug]".to_string(),
                a: vec!["routes/blog/[slug].vlm".to_string()],
                b: Vec::new(),
                shadow: None,
            },
        ],
        ..Default::default()
    }
}

fn no_fetch() -> ExternalFetch {
    Arc::new(|url| Box::pin(async move { Err(HookError::Failed(format!("no fetch: {url}"))) }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vellum_dev::observability::init_tracing();

    // First argument is the config file; missing file means defaults.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vellum.toml".to_string());
    let config = if Path::new(&config_path).is_file() {
        let config = load_config(Path::new(&config_path))?;
        tracing::info!(path = %config_path, "configuration loaded");
        config
    } else {
        tracing::info!(path = %config_path, "no config file, using development defaults");
        DevConfig::development()
    };
    let config = Arc::new(config);
    tracing::info!(
        bind_address = %config.bind_address,
        base = %config.paths.base,
        "starting dev server"
    );

    let loader = Arc::new(MemoryLoader {
        modules: Mutex::new(HashMap::from([
            ("/routes/index.vlm".to_string(), ModuleExports::default()),
            ("/routes/blog/[slug].vlm".to_string(), ModuleExports::default()),
        ])),
    });

    let paths = BuilderPaths {
        root: config.files.root.clone(),
        app_dir: config.app_dir.clone(),
    };
    let manifest = build(&demo_tree(), &paths, Arc::clone(&loader) as Arc<dyn ModuleLoader>)?;
    let cell = Arc::new(ManifestCell::new(manifest));

    // Hot reload: watch the routes directory when it exists.
    let routes_dir = config.files.root.join(&config.files.routes);
    let _watcher = if routes_dir.is_dir() {
        let (watcher, events) = RouteWatcher::new(&routes_dir);
        spawn_rebuilder(
            Arc::clone(&cell),
            Arc::new(FixedTree),
            paths,
            Arc::clone(&loader) as Arc<dyn ModuleLoader>,
            events,
        );
        Some(watcher.run()?)
    } else {
        None
    };

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&config),
        Arc::clone(&cell),
        Collaborators {
            loader,
            engine: Arc::new(TextEngine),
            assets: Arc::new(FsAssets),
            template: Arc::new(InlineTemplate),
            body_parser: Arc::new(DefaultBodyParser),
            repairer: Arc::new(IdentityRepairer),
            fetch: no_fetch(),
            amp: None,
        },
    ));

    let listener = TcpListener::bind(&config.bind_address).await?;
    vellum_dev::http::DevServer::new(&config, dispatcher)
        .run(listener)
        .await?;

    Ok(())
}
