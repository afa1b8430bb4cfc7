//! Structured-output extraction from free-text model replies.

use std::sync::LazyLock;

use competition::AgentError;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("FENCED_JSON regex should compile")
});

static BARE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("BARE_OBJECT regex should compile"));

/// Locate the JSON object in a reply.
///
/// Tries the whole reply, then a fenced ```json block, then the span from the
/// first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    if let Some(body) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return Some(body.as_str());
    }
    BARE_OBJECT.find(text).map(|m| m.as_str())
}

/// Parse an artifact of type `T` from a model reply.
///
/// `what` names the artifact in error messages ("problem", "submission").
pub fn parse_artifact<T: DeserializeOwned>(text: &str, what: &str) -> Result<T, AgentError> {
    let json = extract_json(text)
        .ok_or_else(|| AgentError::validation(format!("no JSON object found in {what} reply")))?;
    serde_json::from_str(json)
        .map_err(|e| AgentError::validation(format!("{what} JSON did not parse: {e}")))
}
