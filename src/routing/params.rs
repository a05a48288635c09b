//! Parameter extraction from pattern matches.
//!
//! # Responsibilities
//! - Turn an ordered list of segment names into a reusable extractor
//! - Map a regex captures array to a name → value map
//!
//! # Design Decisions
//! - Pure function factory: no side effects, safe to share across requests
//! - Rest params (`...name`) default to "" when their group did not match
//! - Plain params are simply absent when their optional group did not match

use std::collections::HashMap;
use std::sync::Arc;

use regex::Captures;

/// Converts a pattern match into route parameters.
///
/// Built once per route entry at manifest construction; cloning is cheap.
#[derive(Debug, Clone)]
pub struct ParamExtractor {
    names: Arc<Vec<String>>,
}

impl ParamExtractor {
    /// Create an extractor for the given ordered segment names.
    ///
    /// A name prefixed with `...` marks a rest parameter.
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: Arc::new(names),
        }
    }

    /// Extract parameters from a match. Capture group `i + 1` corresponds
    /// to `names[i]`.
    pub fn extract(&self, caps: &Captures<'_>) -> HashMap<String, String> {
        let mut params = HashMap::with_capacity(self.names.len());

        for (i, name) in self.names.iter().enumerate() {
            let group = caps.get(i + 1).map(|m| m.as_str());
            match name.strip_prefix("...") {
                Some(rest) => {
                    params.insert(rest.to_string(), group.unwrap_or("").to_string());
                }
                None => {
                    if let Some(value) = group {
                        params.insert(name.clone(), value.to_string());
                    }
                }
            }
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn plain_names_map_positionally() {
        let extractor = ParamExtractor::new(vec!["x".into(), "y".into()]);
        let re = Regex::new("^/([^/]+)/([^/]+)$").unwrap();
        let caps = re.captures("/1/2").unwrap();

        let params = extractor.extract(&caps);
        assert_eq!(params.get("x").map(String::as_str), Some("1"));
        assert_eq!(params.get("y").map(String::as_str), Some("2"));
    }

    #[test]
    fn rest_name_defaults_to_empty_string() {
        let extractor = ParamExtractor::new(vec!["...rest".into()]);
        let re = Regex::new("^/docs(?:/(.*))?$").unwrap();
        let caps = re.captures("/docs").unwrap();

        let params = extractor.extract(&caps);
        assert_eq!(params.get("rest").map(String::as_str), Some(""));
    }

    #[test]
    fn unmatched_plain_name_is_absent() {
        let extractor = ParamExtractor::new(vec!["opt".into()]);
        let re = Regex::new("^/a(?:/([^/]+))?$").unwrap();
        let caps = re.captures("/a").unwrap();

        let params = extractor.extract(&caps);
        assert!(!params.contains_key("opt"));
    }
}
