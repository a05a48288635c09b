//! Pipeline error taxonomy and the lazy stack-repair adapter.
//!
//! # Responsibilities
//! - One error enum covering every way a request can fail
//! - Wrap application errors so the repaired stack is computed lazily,
//!   cached, and never written back to the original error
//!
//! # Design Decisions
//! - Stack repair is expensive and environment-specific, so it lives
//!   behind the `StackRepairer` collaborator trait
//! - Repairing is idempotent: every read returns the same string and the
//!   wrapped error's own stack text stays untouched

use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::modules::LoadError;

/// Errors surfaced by the request dispatcher.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("incomplete request: {0}")]
    Incomplete(&'static str),

    /// Body parse failure. Carries the adapter-supplied status and reason.
    #[error("{reason}")]
    BadBody { status: u16, reason: String },

    /// Usage of an API name retired in a previous release.
    #[error("{0}")]
    RetiredApi(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Application error thrown inside the render engine.
    #[error("{}", .0.message)]
    Thrown(ThrownError),

    #[error("render engine failure: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A source location attached to an application error, when the thrower
/// could map it back to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// An error thrown by application code during rendering, with its raw
/// (unrepaired) stack text.
#[derive(Debug, Clone)]
pub struct ThrownError {
    pub message: String,
    pub stack: String,
    pub frame: Option<SourceFrame>,
}

impl ThrownError {
    pub fn new(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: stack.into(),
            frame: None,
        }
    }
}

/// Environment-specific stack repair, e.g. mapping generated frames back
/// to source files. Potentially expensive; called at most once per error.
pub trait StackRepairer: Send + Sync {
    fn repair(&self, stack: &str) -> String;
}

/// Repairs nothing. Useful where no mapping information exists.
pub struct IdentityRepairer;

impl StackRepairer for IdentityRepairer {
    fn repair(&self, stack: &str) -> String {
        stack.to_string()
    }
}

/// A thrown error whose repaired stack is computed on first access.
///
/// Multiple independent observers can read the repaired stack without
/// corrupting each other: the underlying error is never mutated.
pub struct RepairableError {
    error: ThrownError,
    repairer: Arc<dyn StackRepairer>,
    repaired: OnceLock<String>,
}

impl RepairableError {
    pub fn new(error: ThrownError, repairer: Arc<dyn StackRepairer>) -> Self {
        Self {
            error,
            repairer,
            repaired: OnceLock::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }

    pub fn frame(&self) -> Option<&SourceFrame> {
        self.error.frame.as_ref()
    }

    /// The repaired stack trace, computed on first read and cached.
    pub fn stack(&self) -> &str {
        self.repaired
            .get_or_init(|| self.repairer.repair(&self.error.stack))
    }

    /// The wrapped error, raw stack intact.
    pub fn error(&self) -> &ThrownError {
        &self.error
    }
}

impl std::fmt::Debug for RepairableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairableError")
            .field("message", &self.error.message)
            .field("repaired", &self.repaired.get().is_some())
            .finish()
    }
}
