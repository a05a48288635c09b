//! Live module graph access.
//!
//! # Data Flow
//! ```text
//! component / endpoint / hooks URL
//!     → ModuleLoader (external collaborator, hot-swap semantics)
//!     → ModuleExports (evaluated module, current version)
//!
//! entry ModuleNode
//!     → deps.rs (transitive import closure, cycle-guarded)
//!     → style-bearing nodes → raw CSS text
//! ```
//!
//! # Design Decisions
//! - The graph is owned by the loader; this crate only reads it
//! - Nodes are shared via `Arc`, import edges behind an `RwLock` because
//!   the loader mutates them as files are (re)evaluated
//! - Per-dependency load failures during style collection are swallowed

pub mod deps;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::hooks::HookExports;

/// Opaque component payload handed through to the render engine.
pub type OpaqueExport = Arc<dyn std::any::Any + Send + Sync>;

/// One node of the live module graph.
///
/// `imported` holds the node's direct static and dynamic imports and may
/// change between requests; the dependency resolver snapshots it per read.
pub struct ModuleNode {
    pub url: String,
    pub file: Option<PathBuf>,
    imported: RwLock<Vec<Arc<ModuleNode>>>,
}

impl ModuleNode {
    pub fn new(url: impl Into<String>, file: Option<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            file,
            imported: RwLock::new(Vec::new()),
        })
    }

    /// Record a direct import edge. Called by loader implementations.
    pub fn add_import(&self, node: Arc<ModuleNode>) {
        self.imported
            .write()
            .expect("module graph lock poisoned")
            .push(node);
    }

    /// Snapshot of the current direct imports.
    pub fn imported(&self) -> Vec<Arc<ModuleNode>> {
        self.imported
            .read()
            .expect("module graph lock poisoned")
            .clone()
    }
}

impl std::fmt::Debug for ModuleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleNode")
            .field("url", &self.url)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// The exports of an evaluated module, as far as the pipeline cares.
#[derive(Default, Clone)]
pub struct ModuleExports {
    /// Raw CSS text, present on style modules.
    pub css: Option<String>,

    /// Opaque component or endpoint payload for the render engine.
    pub component: Option<OpaqueExport>,

    /// Names of all exports, for API-surface checks.
    pub names: HashSet<String>,

    /// Typed hook exports, present when this is a hooks module.
    pub hooks: Option<HookExports>,
}

impl ModuleExports {
    pub fn exports_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module not found: {0}")]
    NotFound(String),

    #[error("failed to evaluate {url}: {reason}")]
    Eval { url: String, reason: String },
}

/// External module loader collaborator.
///
/// `resolve` must return the *current* version of the module; the loader
/// is free to cache as long as hot-swap invalidation is honored.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ModuleExports, LoadError>;

    /// Look up the graph node for a previously loaded URL.
    fn node_by_url(&self, url: &str) -> Option<Arc<ModuleNode>>;
}
