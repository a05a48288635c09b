//! Manifest data model.
//!
//! `RouteTree` is the builder's input: a plain description of what the
//! routes directory contains. `RouteManifest` is its output: compiled
//! patterns, component indices and lazy loaders, immutable once built.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::modules::{LoadError, ModuleExports};
use crate::routing::ParamExtractor;

/// The client entry point: source file plus browser-addressable URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub file: String,
    pub url: String,
}

/// What a component node loader produces: the evaluated module, its
/// browser URL and the CSS of its transitive style dependencies.
pub struct LoadedNode {
    pub module: ModuleExports,
    pub entry_url: String,
    pub styles: BTreeMap<String, String>,
}

/// Zero-argument deferred component loader. Invoked at most once per
/// request that needs it; the manifest itself never memoizes the result.
pub type NodeLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<LoadedNode, LoadError>> + Send + Sync>;

/// Deferred endpoint (or shadow endpoint) module loader.
pub type EndpointLoader =
    Arc<dyn Fn() -> BoxFuture<'static, Result<ModuleExports, LoadError>> + Send + Sync>;

/// A page route entry.
#[derive(Clone)]
pub struct PageRoute {
    pub key: String,
    pub pattern: Regex,
    pub params: ParamExtractor,
    /// Server-side data loader co-located with the page, if any.
    pub shadow: Option<EndpointLoader>,
    /// Indices into `RouteManifest::nodes` for the layout+page chain.
    /// `-1` means no component at that slot.
    pub a: Vec<isize>,
    /// Indices for the error-boundary chain, same convention.
    pub b: Vec<isize>,
}

/// An endpoint route entry.
#[derive(Clone)]
pub struct EndpointRoute {
    pub key: String,
    pub pattern: Regex,
    pub params: ParamExtractor,
    pub load: EndpointLoader,
}

/// One route of the manifest.
#[derive(Clone)]
pub enum RouteEntry {
    Page(PageRoute),
    Endpoint(EndpointRoute),
}

impl RouteEntry {
    pub fn pattern(&self) -> &Regex {
        match self {
            RouteEntry::Page(page) => &page.pattern,
            RouteEntry::Endpoint(endpoint) => &endpoint.pattern,
        }
    }

    pub fn params(&self) -> &ParamExtractor {
        match self {
            RouteEntry::Page(page) => &page.params,
            RouteEntry::Endpoint(endpoint) => &endpoint.params,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RouteEntry::Page(page) => &page.key,
            RouteEntry::Endpoint(endpoint) => &endpoint.key,
        }
    }
}

/// A successful route lookup.
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: HashMap<String, String>,
}

/// Immutable snapshot of all routes, assets and component loaders.
///
/// Replaced wholesale on filesystem changes; see `ManifestCell`.
pub struct RouteManifest {
    pub app_dir: String,
    pub assets: HashSet<String>,
    pub mime: HashMap<String, String>,
    pub entry: EntryDescriptor,
    pub nodes: Vec<NodeLoader>,
    pub routes: Vec<RouteEntry>,
}

impl RouteManifest {
    /// Match a path against the routes in manifest order.
    ///
    /// The path is percent-decoded first, so extracted parameter values
    /// are decoded strings. A path that is not valid UTF-8 after decoding
    /// matches nothing.
    pub fn find(&self, path: &str) -> Option<RouteMatch<'_>> {
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        for entry in &self.routes {
            if let Some(caps) = entry.pattern().captures(&decoded) {
                return Some(RouteMatch {
                    entry,
                    params: entry.params().extract(&caps),
                });
            }
        }
        None
    }
}

impl std::fmt::Debug for RouteManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteManifest")
            .field("app_dir", &self.app_dir)
            .field("assets", &self.assets.len())
            .field("nodes", &self.nodes.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

/// A static asset known to the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDef {
    /// Path relative to the static assets directory.
    pub file: String,
}

/// One route as described by the routes directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDef {
    Page {
        /// Route id relative to the routes root, e.g. `blog/[slug]`.
        id: String,
        /// Component ids for the layout+page chain, outermost first.
        a: Vec<String>,
        /// Component ids for the error-boundary chain.
        b: Vec<String>,
        /// Server-side data loader file co-located with the page.
        shadow: Option<String>,
    },
    Endpoint {
        id: String,
        /// Source file relative to the project root.
        file: String,
    },
}

/// Plain description of the routes directory, the builder's input.
#[derive(Debug, Clone, Default)]
pub struct RouteTree {
    /// Distinct leaf components, in node order.
    pub components: Vec<String>,
    pub routes: Vec<RouteDef>,
    pub assets: Vec<AssetDef>,
    pub entry: EntryDescriptor,
}

/// External collaborator that derives a `RouteTree` from the filesystem.
pub trait RouteTreeSource: Send + Sync {
    fn scan(&self) -> std::io::Result<RouteTree>;
}
