//! Vellum development server library.
//!
//! # Architecture Overview
//!
//! ```text
//! route tree on disk ──▶ manifest builder ──▶ RouteManifest snapshot
//!        ▲                                        │ (ArcSwap, replaced
//!        │ add/remove events                      │  wholesale on change)
//!    fs watcher                                   ▼
//!                                          request dispatcher
//!  Client Request ───▶ http server ───▶  asset / favicon / base-path
//!                                          short-circuits, hook chain,
//!                                          body parse, render engine
//!                                                 │
//!  Client Response ◀──────────────────────────────┘
//! ```
//!
//! The manifest is immutable once built; in-flight requests keep the
//! snapshot they loaded at dispatch start even while a rebuild swaps in
//! a newer one.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod hooks;
pub mod http;
pub mod manifest;
pub mod modules;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::DevConfig;
pub use dispatch::Dispatcher;
pub use http::DevServer;
pub use manifest::{ManifestCell, RouteManifest};
