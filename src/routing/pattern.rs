//! Route id → regex compilation.
//!
//! A route id is the route's directory path relative to the routes root,
//! e.g. `blog/[slug]` or `docs/[...path]`. Dynamic segments use square
//! brackets: `[name]` matches exactly one path segment, `[...name]`
//! matches the rest of the path (possibly nothing).

use regex::Regex;
use thiserror::Error;

/// A compiled route pattern plus the ordered names of its capture groups.
///
/// Rest parameters keep their `...` prefix in `names` so the extractor
/// can apply the empty-string default.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub pattern: Regex,
    pub names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("route id {id:?} has an unterminated `[` in segment {segment:?}")]
    Unterminated { id: String, segment: String },

    #[error("route id {id:?}: rest segment [...{name}] must be the final segment")]
    RestNotLast { id: String, name: String },

    #[error("route id {id:?} produced an invalid pattern: {source}")]
    Compile {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Compile a route id into an anchored regex and its parameter names.
///
/// The empty id (the root route) compiles to `^/$`. All other ids match
/// with an optional trailing slash.
pub fn compile_route_id(id: &str) -> Result<CompiledPattern, PatternError> {
    if id.is_empty() {
        return Ok(CompiledPattern {
            pattern: Regex::new("^/$").expect("root pattern is valid"),
            names: Vec::new(),
        });
    }

    let segments: Vec<&str> = id.split('/').collect();
    let mut source = String::from("^");
    let mut names = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        if let Some(name) = rest_name(segment) {
            if i != segments.len() - 1 {
                return Err(PatternError::RestNotLast {
                    id: id.to_string(),
                    name: name.to_string(),
                });
            }
            // The whole segment, slash included, is optional.
            source.push_str("(?:/(.*))?");
            names.push(format!("...{name}"));
            continue;
        }

        source.push('/');
        source.push_str(&compile_segment(id, segment, &mut names)?);
    }

    source.push_str("/?$");
    let pattern = Regex::new(&source).map_err(|source| PatternError::Compile {
        id: id.to_string(),
        source,
    })?;

    Ok(CompiledPattern { pattern, names })
}

/// Returns the parameter name if the segment is a rest segment.
fn rest_name(segment: &str) -> Option<&str> {
    segment.strip_prefix("[...")?.strip_suffix(']')
}

fn compile_segment(id: &str, segment: &str, names: &mut Vec<String>) -> Result<String, PatternError> {
    let mut out = String::new();
    let mut rest = segment;

    while let Some(open) = rest.find('[') {
        out.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find(']').ok_or_else(|| PatternError::Unterminated {
            id: id.to_string(),
            segment: segment.to_string(),
        })?;
        names.push(after[..close].to_string());
        out.push_str("([^/]+?)");
        rest = &after[close + 1..];
    }
    out.push_str(&regex::escape(rest));

    Ok(out)
}
