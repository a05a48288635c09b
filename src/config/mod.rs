//! Development server configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DevConfig (validated, immutable)
//!     → shared via Arc with the dispatcher and server
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so a project can run with no config file
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every violation, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DevConfig, FilesConfig, PathsConfig};
