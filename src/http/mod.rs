//! HTTP serving shell.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware)
//!     → dispatch::Dispatcher (the per-request pipeline)
//!     → response to client
//! ```

pub mod server;

pub use server::DevServer;
