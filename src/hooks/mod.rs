//! Request interceptor ("hook") resolution and chaining.
//!
//! # Data Flow
//! ```text
//! hooks module on disk (optional, user-supplied)
//!     → ModuleLoader (evaluate, hot-swap aware)
//!     → retired-name check (getContext, serverFetch → hard error)
//!     → Hooks bundle, each hook defaulted independently
//!     → handle optionally pre-composed with the AMP validation hook
//!
//! request event
//!     → handle(event, resolve) … continuation-passing chain
//!     → last resolve = the actual render invocation
//! ```
//!
//! # Design Decisions
//! - Hooks are plain `Arc` closures so user modules and internal hooks
//!   compose identically
//! - Composition is sequential: each stage decides whether to call its
//!   `resolve` continuation
//! - Retired API names fail fast with a descriptive error, never a
//!   silent no-op

pub mod amp;

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::dispatch::body::ParsedBody;
use crate::errors::{PipelineError, RepairableError};
use crate::render::RenderedResponse;

/// The per-request event handed through the hook chain.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: ParsedBody,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Retired(String),

    /// An application error thrown during rendering, raw stack attached.
    #[error("{}", .0.message)]
    Thrown(crate::errors::ThrownError),

    #[error("hook failed: {0}")]
    Failed(String),
}

/// A hook either produces a response, lets the chain fall through with
/// `None`, or fails.
pub type HookResult = Result<Option<RenderedResponse>, HookError>;

/// Continuation bound to the next stage of the chain.
pub type Resolve = Arc<dyn Fn(RequestEvent) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// A request interceptor.
pub type Handle = Arc<dyn Fn(RequestEvent, Resolve) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Produces the session value exposed to pages.
pub type GetSession = Arc<dyn Fn(&RequestEvent) -> serde_json::Value + Send + Sync>;

/// Observes application errors funneled out of the render engine.
pub type HandleError = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Outbound fetch used during server-side rendering.
pub type ExternalFetch =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<RenderedResponse, HookError>> + Send + Sync>;

/// Hook exports found on an evaluated hooks module.
#[derive(Default, Clone)]
pub struct HookExports {
    pub handle: Option<Handle>,
    pub get_session: Option<GetSession>,
    pub handle_error: Option<HandleError>,
    pub external_fetch: Option<ExternalFetch>,
}

/// The fully defaulted hooks bundle used for one request.
#[derive(Clone)]
pub struct Hooks {
    pub handle: Handle,
    pub get_session: GetSession,
    pub handle_error: HandleError,
    pub external_fetch: ExternalFetch,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Export names retired in a previous release, with their replacements.
const RETIRED: &[(&str, &str)] = &[
    ("getContext", "getContext has been removed: return the data from getSession instead"),
    ("serverFetch", "serverFetch has been renamed to externalFetch"),
];

impl Hooks {
    /// Build the bundle from an optional hooks module, defaulting each
    /// hook independently. `ambient_fetch` backs `externalFetch` when the
    /// user supplied none.
    pub fn resolve(
        module: Option<&crate::modules::ModuleExports>,
        ambient_fetch: ExternalFetch,
    ) -> Result<Self, PipelineError> {
        if let Some(module) = module {
            for (name, message) in RETIRED {
                if module.exports_name(name) {
                    return Err(PipelineError::RetiredApi(format!(
                        "hooks module exports `{name}`: {message}"
                    )));
                }
            }
        }

        let exports = module.and_then(|m| m.hooks.clone()).unwrap_or_default();

        Ok(Self {
            handle: exports.handle.unwrap_or_else(passthrough_handle),
            get_session: exports
                .get_session
                .unwrap_or_else(|| Arc::new(|_| serde_json::Value::Object(Default::default()))),
            handle_error: exports.handle_error.unwrap_or_else(default_handle_error),
            external_fetch: exports.external_fetch.unwrap_or(ambient_fetch),
        })
    }
}

/// The default `handle`: invoke resolve on the event unchanged.
pub fn passthrough_handle() -> Handle {
    Arc::new(|event, resolve| resolve(event))
}

fn default_handle_error() -> HandleError {
    Arc::new(|error_event| {
        let error = &error_event.error;
        match error.frame() {
            Some(frame) => tracing::error!(
                message = %error.message(),
                frame = %frame,
                stack = %error.stack(),
                "unhandled application error"
            ),
            None => tracing::error!(
                message = %error.message(),
                stack = %error.stack(),
                "unhandled application error"
            ),
        }
    })
}

/// Chain two hooks: `first` runs with a continuation bound to `second`,
/// whose own continuation is the caller-supplied `resolve`.
pub fn sequence(first: Handle, second: Handle) -> Handle {
    Arc::new(move |event, resolve| {
        let first = Arc::clone(&first);
        let second = Arc::clone(&second);
        Box::pin(async move {
            let tail: Resolve = Arc::new(move |event| {
                let second = Arc::clone(&second);
                let resolve = Arc::clone(&resolve);
                Box::pin(async move { second(event, resolve).await })
            });
            first(event, tail).await
        })
    })
}

/// Context handed to `handleError`.
pub struct ErrorEvent {
    pub error: Arc<RepairableError>,
    event: RequestEvent,
}

impl ErrorEvent {
    pub fn new(error: Arc<RepairableError>, event: RequestEvent) -> Self {
        Self { error, event }
    }

    pub fn event(&self) -> &RequestEvent {
        &self.event
    }

    /// Retired accessor from a previous API version. Always errors.
    pub fn request(&self) -> Result<&RequestEvent, HookError> {
        Err(HookError::Retired(
            "`request` in handleError has been replaced with `event`".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{IdentityRepairer, ThrownError};
    use crate::modules::ModuleExports;
    use axum::http::StatusCode;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn event() -> RequestEvent {
        RequestEvent {
            method: Method::GET,
            url: Url::parse("http://localhost/").unwrap(),
            headers: HeaderMap::new(),
            body: ParsedBody::Empty,
        }
    }

    fn noop_fetch() -> ExternalFetch {
        Arc::new(|_| Box::pin(async { Err(HookError::Failed("no fetch in tests".into())) }))
    }

    fn text_response(body: &str) -> RenderedResponse {
        RenderedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn default_handle_invokes_resolve_unchanged() {
        let hooks = Hooks::resolve(None, noop_fetch()).unwrap();
        let resolve: Resolve =
            Arc::new(|event| Box::pin(async move { Ok(Some(text_response(event.url.path()))) }));

        let out = (hooks.handle)(event(), resolve).await.unwrap().unwrap();
        assert_eq!(out.body, b"/");
    }

    #[tokio::test]
    async fn sequence_runs_stages_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let tag = |label: &'static str, order: Arc<Mutex<Vec<&'static str>>>| -> Handle {
            Arc::new(move |event, resolve| {
                let order = Arc::clone(&order);
                Box::pin(async move {
                    order.lock().unwrap().push(label);
                    resolve(event).await
                })
            })
        };

        let chained = sequence(
            tag("first", Arc::clone(&order)),
            tag("second", Arc::clone(&order)),
        );
        let final_order = Arc::clone(&order);
        let resolve: Resolve = Arc::new(move |_| {
            let order = Arc::clone(&final_order);
            Box::pin(async move {
                order.lock().unwrap().push("render");
                Ok(None)
            })
        });

        chained(event(), resolve).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "render"]);
    }

    #[tokio::test]
    async fn early_stage_can_short_circuit() {
        let first: Handle =
            Arc::new(|_, _| Box::pin(async { Ok(Some(text_response("intercepted"))) }));
        let second = passthrough_handle();

        let chained = sequence(first, second);
        let resolve: Resolve = Arc::new(|_| Box::pin(async { Ok(Some(text_response("render"))) }));

        let out = chained(event(), resolve).await.unwrap().unwrap();
        assert_eq!(out.body, b"intercepted");
    }

    #[test]
    fn default_session_is_an_empty_object() {
        let hooks = Hooks::resolve(None, noop_fetch()).unwrap();
        let session = (hooks.get_session)(&event());
        assert_eq!(session, serde_json::json!({}));
    }

    #[test]
    fn retired_export_names_fail_resolution() {
        let module = ModuleExports {
            names: HashSet::from(["getContext".to_string()]),
            ..Default::default()
        };

        let err = Hooks::resolve(Some(&module), noop_fetch()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("getContext"), "unexpected: {message}");

        let module = ModuleExports {
            names: HashSet::from(["serverFetch".to_string()]),
            ..Default::default()
        };
        let err = Hooks::resolve(Some(&module), noop_fetch()).unwrap_err();
        assert!(err.to_string().contains("externalFetch"));
    }

    #[test]
    fn error_event_request_accessor_is_retired() {
        let error = Arc::new(RepairableError::new(
            ThrownError::new("boom", "stack"),
            Arc::new(IdentityRepairer),
        ));
        let error_event = ErrorEvent::new(error, event());

        let err = error_event.request().unwrap_err();
        assert!(err.to_string().contains("replaced with `event`"));
        assert_eq!(error_event.event().url.path(), "/");
    }
}
