//! Route manifest construction.
//!
//! # Responsibilities
//! - Compile each route id into a pattern + parameter extractor
//! - Flatten leaf components into the ordered node-loader list
//! - Resolve page component ids to node indices (`-1` when absent)
//! - Wire lazy loaders that evaluate modules and gather their styles
//!
//! # Design Decisions
//! - Deterministic: the same tree always builds the same manifest
//! - Tree-external component ids resolve against the project root,
//!   tree-internal ids resolve root-relative for the browser
//! - Loaders capture `Arc`s only; the manifest stays cheap to drop

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::modules::deps::collect_styles;
use crate::modules::ModuleLoader;
use crate::routing::{compile_route_id, ParamExtractor, PatternError};

use super::types::{
    EndpointLoader, EndpointRoute, LoadedNode, NodeLoader, PageRoute, RouteDef, RouteEntry,
    RouteManifest, RouteTree,
};

/// Filesystem context for the build.
#[derive(Debug, Clone)]
pub struct BuilderPaths {
    /// Project root; tree-external component ids resolve against it.
    pub root: PathBuf,
    /// Application directory name exposed to the client (e.g. `_app`).
    pub app_dir: String,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Build a manifest snapshot from a route tree description.
pub fn build(
    tree: &RouteTree,
    paths: &BuilderPaths,
    loader: Arc<dyn ModuleLoader>,
) -> Result<RouteManifest, BuildError> {
    let nodes: Vec<NodeLoader> = tree
        .components
        .iter()
        .map(|id| node_loader(Arc::clone(&loader), component_url(&paths.root, id)))
        .collect();

    let mut routes = Vec::with_capacity(tree.routes.len());
    for def in &tree.routes {
        routes.push(build_route(def, tree, paths, &loader)?);
    }

    let assets = tree.assets.iter().map(|a| a.file.clone()).collect();
    let mime = tree
        .assets
        .iter()
        .filter_map(|a| {
            let ext = Path::new(&a.file).extension()?.to_str()?;
            Some((
                ext.to_string(),
                mime_guess::from_ext(ext).first_or_octet_stream().to_string(),
            ))
        })
        .collect();

    Ok(RouteManifest {
        app_dir: paths.app_dir.clone(),
        assets,
        mime,
        entry: tree.entry.clone(),
        nodes,
        routes,
    })
}

fn build_route(
    def: &RouteDef,
    tree: &RouteTree,
    paths: &BuilderPaths,
    loader: &Arc<dyn ModuleLoader>,
) -> Result<RouteEntry, BuildError> {
    match def {
        RouteDef::Page { id, a, b, shadow } => {
            let compiled = compile_route_id(id)?;
            Ok(RouteEntry::Page(PageRoute {
                key: id.clone(),
                pattern: compiled.pattern,
                params: ParamExtractor::new(compiled.names),
                shadow: shadow
                    .as_ref()
                    .map(|file| endpoint_loader(Arc::clone(loader), &paths.root, file)),
                a: node_indices(a, &tree.components),
                b: node_indices(b, &tree.components),
            }))
        }
        RouteDef::Endpoint { id, file } => {
            let compiled = compile_route_id(id)?;
            Ok(RouteEntry::Endpoint(EndpointRoute {
                key: id.clone(),
                pattern: compiled.pattern,
                params: ParamExtractor::new(compiled.names),
                load: endpoint_loader(Arc::clone(loader), &paths.root, file),
            }))
        }
    }
}

/// First-index identity lookup; ids not present in the node list map to
/// `-1`, meaning "no component at that slot".
fn node_indices(ids: &[String], components: &[String]) -> Vec<isize> {
    ids.iter()
        .map(|id| {
            components
                .iter()
                .position(|c| c == id)
                .map(|i| i as isize)
                .unwrap_or(-1)
        })
        .collect()
}

/// Browser-addressable URL for a component id: path-relative resolution
/// for ids that escape the tree, root-relative otherwise.
fn component_url(root: &Path, id: &str) -> String {
    if id.starts_with("..") || Path::new(id).is_absolute() {
        normalize(&root.join(id)).to_string_lossy().into_owned()
    } else {
        format!("/{id}")
    }
}

/// Lexical normalization; no filesystem access.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

fn node_loader(loader: Arc<dyn ModuleLoader>, url: String) -> NodeLoader {
    Arc::new(move || {
        let loader = Arc::clone(&loader);
        let url = url.clone();
        Box::pin(async move {
            let module = loader.resolve(&url).await?;
            let styles = match loader.node_by_url(&url) {
                Some(node) => collect_styles(loader.as_ref(), &node).await,
                None => Default::default(),
            };
            Ok(LoadedNode {
                module,
                entry_url: url,
                styles,
            })
        })
    })
}

fn endpoint_loader(loader: Arc<dyn ModuleLoader>, root: &Path, file: &str) -> EndpointLoader {
    let url = normalize(&root.join(file)).to_string_lossy().into_owned();
    Arc::new(move || {
        let loader = Arc::clone(&loader);
        let url = url.clone();
        Box::pin(async move { loader.resolve(&url).await })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::types::{AssetDef, EntryDescriptor};
    use crate::modules::{LoadError, ModuleExports, ModuleNode};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLoader {
        resolved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModuleLoader for RecordingLoader {
        async fn resolve(&self, url: &str) -> Result<ModuleExports, LoadError> {
            self.resolved.lock().unwrap().push(url.to_string());
            Ok(ModuleExports::default())
        }

        fn node_by_url(&self, _url: &str) -> Option<Arc<ModuleNode>> {
            None
        }
    }

    fn sample_tree() -> RouteTree {
        RouteTree {
            components: vec![
                "layout.vlm".to_string(),
                "error.vlm".to_string(),
                "routes/blog/[slug].vlm".to_string(),
            ],
            routes: vec![
                RouteDef::Page {
                    id: "blog/[slug]".to_string(),
                    a: vec!["layout.vlm".to_string(), "routes/blog/[slug].vlm".to_string()],
                    b: vec!["error.vlm".to_string(), "missing.vlm".to_string()],
                    shadow: None,
                },
                RouteDef::Endpoint {
                    id: "api/posts.json".to_string(),
                    file: "routes/api/posts.json.rs".to_string(),
                },
            ],
            assets: vec![
                AssetDef {
                    file: "logo.png".to_string(),
                },
                AssetDef {
                    file: "styles/site.css".to_string(),
                },
            ],
            entry: EntryDescriptor {
                file: "entry.client.rs".to_string(),
                url: "/_app/entry.client.js".to_string(),
            },
        }
    }

    fn paths() -> BuilderPaths {
        BuilderPaths {
            root: PathBuf::from("/project"),
            app_dir: "_app".to_string(),
        }
    }

    #[test]
    fn node_count_matches_distinct_components() {
        let manifest = build(&sample_tree(), &paths(), Arc::new(RecordingLoader::default())).unwrap();
        assert_eq!(manifest.nodes.len(), 3);
    }

    #[test]
    fn component_indices_are_valid_or_minus_one() {
        let manifest = build(&sample_tree(), &paths(), Arc::new(RecordingLoader::default())).unwrap();

        let page = match &manifest.routes[0] {
            RouteEntry::Page(page) => page,
            _ => panic!("expected page route"),
        };
        assert_eq!(page.a, vec![0, 2]);
        assert_eq!(page.b, vec![1, -1]);

        let bound = manifest.nodes.len() as isize;
        for index in page.a.iter().chain(page.b.iter()) {
            assert!(*index == -1 || (0..bound).contains(index));
        }
    }

    #[test]
    fn mime_table_is_derived_from_assets() {
        let manifest = build(&sample_tree(), &paths(), Arc::new(RecordingLoader::default())).unwrap();
        assert_eq!(manifest.mime.get("css").unwrap(), "text/css");
        assert_eq!(manifest.mime.get("png").unwrap(), "image/png");
        assert!(manifest.assets.contains("logo.png"));
    }

    #[test]
    fn find_matches_in_manifest_order_with_params() {
        let manifest = build(&sample_tree(), &paths(), Arc::new(RecordingLoader::default())).unwrap();

        let matched = manifest.find("/blog/hello-world").unwrap();
        assert_eq!(matched.entry.key(), "blog/[slug]");
        assert_eq!(matched.params.get("slug").map(String::as_str), Some("hello-world"));

        assert!(manifest.find("/nowhere").is_none());
    }

    #[test]
    fn find_decodes_percent_encoded_segments() {
        let manifest = build(&sample_tree(), &paths(), Arc::new(RecordingLoader::default())).unwrap();

        let matched = manifest.find("/blog/hello%20world").unwrap();
        assert_eq!(
            matched.params.get("slug").map(String::as_str),
            Some("hello world")
        );
    }

    #[tokio::test]
    async fn endpoint_loader_defers_to_module_loader() {
        let loader = Arc::new(RecordingLoader::default());
        let manifest = build(&sample_tree(), &paths(), Arc::clone(&loader) as Arc<dyn ModuleLoader>)
            .unwrap();

        // Nothing resolved at build time.
        assert!(loader.resolved.lock().unwrap().is_empty());

        let endpoint = match &manifest.routes[1] {
            RouteEntry::Endpoint(endpoint) => endpoint,
            _ => panic!("expected endpoint route"),
        };
        (endpoint.load)().await.unwrap();

        let resolved = loader.resolved.lock().unwrap();
        assert_eq!(resolved.as_slice(), ["/project/routes/api/posts.json.rs"]);
    }

    #[tokio::test]
    async fn shadow_loader_resolves_the_colocated_file() {
        let mut tree = sample_tree();
        if let RouteDef::Page { shadow, .. } = &mut tree.routes[0] {
            *shadow = Some("routes/blog/[slug].rs".to_string());
        }

        let loader = Arc::new(RecordingLoader::default());
        let manifest = build(&tree, &paths(), Arc::clone(&loader) as Arc<dyn ModuleLoader>).unwrap();

        let page = match &manifest.routes[0] {
            RouteEntry::Page(page) => page,
            _ => panic!("expected page route"),
        };
        (page.shadow.as_ref().unwrap())().await.unwrap();

        let resolved = loader.resolved.lock().unwrap();
        assert_eq!(resolved.as_slice(), ["/project/routes/blog/[slug].rs"]);
    }

    #[test]
    fn component_urls_resolve_by_tree_membership() {
        assert_eq!(
            component_url(Path::new("/project"), "routes/index.vlm"),
            "/routes/index.vlm"
        );
        assert_eq!(
            component_url(Path::new("/project"), "../shared/header.vlm"),
            "/shared/header.vlm"
        );
    }
}
