//! Route manifest construction and hot-swapped publication.
//!
//! # Data Flow
//! ```text
//! routes directory on disk
//!     → RouteTreeSource (scan into a RouteTree description)
//!     → builder.rs (compile patterns, wire lazy loaders, index components)
//!     → RouteManifest (immutable snapshot)
//!     → cell.rs (ArcSwap publication)
//!
//! On watcher add/remove event:
//!     watch.rs → rebuild task → new snapshot swapped in wholesale
//! ```
//!
//! # Design Decisions
//! - A manifest is never patched in place; rebuilds produce a fresh value
//! - Requests load one `Arc` snapshot at dispatch start and keep it, so a
//!   concurrent rebuild can never tear an in-flight request
//! - Component loaders are lazy and un-memoized; caching belongs to the
//!   module loader collaborator

pub mod builder;
pub mod cell;
pub mod types;
pub mod watch;

pub use builder::{build, BuildError, BuilderPaths};
pub use cell::{spawn_rebuilder, FsEvent, ManifestCell};
pub use types::{
    AssetDef, EndpointLoader, EndpointRoute, EntryDescriptor, LoadedNode, NodeLoader, PageRoute,
    RouteDef, RouteEntry, RouteManifest, RouteMatch, RouteTree, RouteTreeSource,
};
pub use watch::RouteWatcher;
