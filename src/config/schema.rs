//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the development server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Application directory name exposed to the client.
    pub app_dir: String,

    /// URL path prefixes.
    pub paths: PathsConfig,

    /// Project file locations.
    pub files: FilesConfig,

    /// Chain the AMP validation hook ahead of the user's `handle`.
    pub amp: bool,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

/// URL path prefixes shared with client code.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PathsConfig {
    /// Base path every routable URL must start with. Empty or `/sub`.
    pub base: String,

    /// Assets prefix; falls back to `base` when empty.
    pub assets: String,
}

/// Project file locations, relative to the project root.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Project root directory.
    pub root: PathBuf,

    /// Static assets directory.
    pub assets: PathBuf,

    /// Routes directory.
    pub routes: PathBuf,

    /// Hooks module source file (optional feature; file may not exist).
    pub hooks: PathBuf,

    /// HTML template file.
    pub template: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            assets: PathBuf::from("static"),
            routes: PathBuf::from("src/routes"),
            hooks: PathBuf::from("src/hooks.rs"),
            template: PathBuf::from("src/app.html"),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum time a request may take end-to-end, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            app_dir: "_app".to_string(),
            paths: PathsConfig::default(),
            files: FilesConfig::default(),
            amp: false,
            timeouts: TimeoutConfig::default(),
            body_limit: 1024 * 1024,
        }
    }
}

impl DevConfig {
    /// Defaults suitable for tests and zero-config projects.
    pub fn development() -> Self {
        Self::default()
    }

    /// The assets prefix, falling back to `base` when unset.
    pub fn assets_path(&self) -> &str {
        if self.paths.assets.is_empty() {
            &self.paths.base
        } else {
            &self.paths.assets
        }
    }
}
