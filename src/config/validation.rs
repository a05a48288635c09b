//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate path prefixes and file locations
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: DevConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use super::schema::DevConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("paths.base must be \"\" or start with '/' and not end with '/', got {0:?}")]
    InvalidBasePath(String),

    #[error("paths.assets must be \"\" or start with '/', got {0:?}")]
    InvalidAssetsPath(String),

    #[error("app_dir must be a bare directory name, got {0:?}")]
    InvalidAppDir(String),

    #[error("bind_address is not a valid socket address: {0:?}")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Check everything serde cannot.
pub fn validate_config(config: &DevConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = &config.paths.base;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::InvalidBasePath(base.clone()));
    }

    let assets = &config.paths.assets;
    if !assets.is_empty() && !assets.starts_with('/') {
        errors.push(ValidationError::InvalidAssetsPath(assets.clone()));
    }

    if config.app_dir.is_empty() || config.app_dir.contains('/') {
        errors.push(ValidationError::InvalidAppDir(config.app_dir.clone()));
    }

    if config.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.bind_address.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
