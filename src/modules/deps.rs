//! Transitive dependency discovery over the module graph.
//!
//! # Responsibilities
//! - Walk `imported` edges from an entry node, collecting every reachable node
//! - Guarantee termination on cyclic graphs via the visited set
//! - Filter the closure for style-bearing modules and capture their CSS
//!
//! # Design Decisions
//! - The visited set doubles as the result: a node already present is
//!   never re-traversed (hard invariant)
//! - Keyed by module URL; the set lives for one loader invocation only
//! - A dependency that fails to load costs us its styles, nothing else

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ModuleLoader, ModuleNode};

/// Visited nodes of one traversal, keyed by URL.
pub type DependencySet = HashMap<String, Arc<ModuleNode>>;

/// File extensions treated as stylesheets.
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "styl", "stylus", "pcss"];

/// Recursively add every module reachable from `node` to `seen`.
///
/// The entry node itself is not inserted; only its dependents are.
pub fn collect_dependencies(node: &Arc<ModuleNode>, seen: &mut DependencySet) {
    for dep in node.imported() {
        if seen.insert(dep.url.clone(), Arc::clone(&dep)).is_none() {
            collect_dependencies(&dep, seen);
        }
    }
}

/// Collect the CSS text of every style dependency of `entry`.
///
/// Keys are module URLs; ordering is stable so inlined style tags do not
/// jump around between renders.
pub async fn collect_styles(
    loader: &dyn ModuleLoader,
    entry: &Arc<ModuleNode>,
) -> BTreeMap<String, String> {
    let mut seen = DependencySet::new();
    collect_dependencies(entry, &mut seen);

    let mut styles = BTreeMap::new();
    for (url, node) in &seen {
        if !is_style_module(node) {
            continue;
        }
        // A dynamically-imported module may not be resolvable through the
        // static graph; skip it rather than failing the whole page.
        match loader.resolve(url).await {
            Ok(module) => {
                if let Some(css) = module.css {
                    styles.insert(url.clone(), css);
                }
            }
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "skipping unloadable style dependency");
            }
        }
    }

    styles
}

/// A module carries styles if it is a stylesheet file or the style variant
/// of a component (marked by a `type=style` query parameter).
fn is_style_module(node: &ModuleNode) -> bool {
    if let Some((_, query)) = node.url.split_once('?') {
        if query.split('&').any(|pair| pair == "type=style") {
            return true;
        }
    }

    node.file
        .as_deref()
        .and_then(|f| f.extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| STYLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
