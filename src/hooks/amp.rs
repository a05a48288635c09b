//! AMP validation hook.
//!
//! When AMP support is enabled, this hook is chained ahead of the user's
//! `handle`. It lets the rest of the chain produce the response, then runs
//! the external validator over HTML bodies and replaces the markup with
//! the validator's diagnostics when validation fails.

use std::sync::Arc;

use axum::http::header;

use super::{Handle, HookError};

/// Severity of a single validator finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpSeverity {
    Warning,
    Error,
}

/// One finding reported by the validator.
#[derive(Debug, Clone)]
pub struct AmpDiagnostic {
    pub severity: AmpSeverity,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// External AMP validator collaborator. An empty result means the
/// document is valid.
pub trait AmpValidator: Send + Sync {
    fn validate(&self, html: &str) -> Vec<AmpDiagnostic>;
}

/// Build the internal validation hook around a validator.
pub fn validation_hook(validator: Arc<dyn AmpValidator>) -> Handle {
    Arc::new(move |event, resolve| {
        let validator = Arc::clone(&validator);
        Box::pin(async move {
            let mut response = match resolve(event).await? {
                Some(response) => response,
                None => return Ok(None),
            };

            if !is_html(&response.headers) {
                return Ok(Some(response));
            }

            let html = String::from_utf8(response.body.clone()).map_err(|_| {
                HookError::Failed("rendered HTML is not valid UTF-8".to_string())
            })?;

            let diagnostics = validator.validate(&html);
            let errors: Vec<&AmpDiagnostic> = diagnostics
                .iter()
                .filter(|d| d.severity == AmpSeverity::Error)
                .collect();

            if !errors.is_empty() {
                tracing::warn!(count = errors.len(), "AMP validation failed");
                response.body = render_diagnostics(&errors).into_bytes();
            }

            Ok(Some(response))
        })
    })
}

fn is_html(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

fn render_diagnostics(errors: &[&AmpDiagnostic]) -> String {
    let mut out = String::from("<!doctype html><head><meta charset=\"utf-8\"></head><body><h1>AMP validation failed</h1><ul>");
    for d in errors {
        out.push_str(&format!(
            "<li>line {}, column {}: {}</li>",
            d.line, d.column, d.message
        ));
    }
    out.push_str("</ul></body>");
    out
}
