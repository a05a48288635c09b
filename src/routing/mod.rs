//! Route pattern compilation and parameter extraction.
//!
//! # Data Flow
//! ```text
//! Route id ("blog/[slug]", "docs/[...path]")
//!     → pattern.rs (compile to anchored regex + ordered segment names)
//!     → stored on the manifest's route entries
//!
//! Incoming path
//!     → regex match against each entry in order
//!     → params.rs (captures array → name/value map)
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at manifest build time, immutable afterwards
//! - First matching route wins (manifest order is significant)
//! - No caching of match results across manifest rebuilds
//! - Rest segments (`[...name]`) capture the remainder, defaulting to ""

pub mod params;
pub mod pattern;

pub use params::ParamExtractor;
pub use pattern::{compile_route_id, CompiledPattern, PatternError};
