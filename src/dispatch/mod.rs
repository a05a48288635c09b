//! Per-request dispatch.
//!
//! # Data Flow
//! ```text
//! transport request
//!     → validate / decode (absolute URL, percent-decoded path)
//!     → asset short-circuit → static asset server
//!     → favicon / base-path short-circuits → 404
//!     → hook resolution (user module + defaults, retired-name guard)
//!     → body parse (adapter-supplied status on failure)
//!     → hook chain, last resolve = render engine
//!     → response, 404 on engine fall-through
//!
//! Any uncaught error → repaired stack trace, 500, stack in the body.
//! ```
//!
//! # Design Decisions
//! - Strictly sequential state machine with early-exit terminal states
//! - The manifest snapshot is loaded once per request, up front
//! - Runtime paths travel in the render context, never in global state

pub mod body;
pub mod dispatcher;

pub use body::{BodyError, BodyParser, DefaultBodyParser, ParsedBody};
pub use dispatcher::{Collaborators, Dispatcher};
