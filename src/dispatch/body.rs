//! Request body parsing.
//!
//! The dispatcher delegates body interpretation to a `BodyParser`
//! collaborator so the framework's request adapter can evolve
//! independently. A parse failure terminates the request with the
//! adapter-supplied status before hooks or the render engine run.

use axum::http::StatusCode;
use thiserror::Error;

/// A parsed request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParsedBody {
    #[default]
    Empty,
    Text(String),
    Json(serde_json::Value),
    Binary(Vec<u8>),
}

/// Parse failure with the status the response should carry.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct BodyError {
    pub status: StatusCode,
    pub reason: String,
}

impl BodyError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            reason: reason.into(),
        }
    }
}

/// Request-adapter collaborator.
pub trait BodyParser: Send + Sync {
    fn parse(&self, content_type: Option<&str>, raw: &[u8]) -> Result<ParsedBody, BodyError>;
}

/// Content-type driven parser used when the embedder supplies none.
pub struct DefaultBodyParser;

impl BodyParser for DefaultBodyParser {
    fn parse(&self, content_type: Option<&str>, raw: &[u8]) -> Result<ParsedBody, BodyError> {
        if raw.is_empty() {
            return Ok(ParsedBody::Empty);
        }

        let media_type = content_type
            .unwrap_or("")
            .split(';')
            .next()
            .unwrap_or("")
            .trim();

        if media_type == "application/json" || media_type.ends_with("+json") {
            let value = serde_json::from_slice(raw)
                .map_err(|e| BodyError::bad_request(format!("invalid JSON body: {e}")))?;
            return Ok(ParsedBody::Json(value));
        }

        if media_type.starts_with("text/") || media_type == "application/x-www-form-urlencoded" {
            let text = std::str::from_utf8(raw)
                .map_err(|_| BodyError::bad_request("body is not valid UTF-8"))?;
            return Ok(ParsedBody::Text(text.to_string()));
        }

        Ok(ParsedBody::Binary(raw.to_vec()))
    }
}
