//! Click-to-apply alternatives embedded in assistant replies.
//!
//! The assistant appends a `<SUGGESTIONS>{...}</SUGGESTIONS>` block holding
//! candidate segments, attribute filters, and free-form hints.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[expect(clippy::unwrap_used, reason = "static regex pattern is valid")]
static SUGGESTION_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<SUGGESTIONS>(.*?)</SUGGESTIONS>").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Suggestions {
    pub segments: Vec<SuggestionGroup>,
    pub attributes: Vec<SuggestionGroup>,
    pub other: Vec<OtherSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionGroup {
    /// The user's wording this group offers alternatives for.
    #[serde(rename = "for")]
    pub for_text: String,
    pub options: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtherSuggestion {
    pub text: String,
}

impl Suggestions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.attributes.is_empty() && self.other.is_empty()
    }
}

/// Extract the first suggestions block from assistant text.
///
/// Returns `None` when there is no block, the block is not valid JSON, or
/// nothing survives normalisation.
#[must_use]
pub fn parse_suggestions(text: &str) -> Option<Suggestions> {
    let raw = SUGGESTION_BLOCK.captures(text)?.get(1)?.as_str();
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse suggestions block");
            return None;
        },
    };
    let other = parsed
        .get("other")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .filter(|text| !text.is_empty())
                .map(|text| OtherSuggestion { text: text.to_owned() })
                .collect()
        })
        .unwrap_or_default();
    let suggestions = Suggestions {
        segments: normalize_groups(parsed.get("segments")),
        attributes: normalize_groups(parsed.get("attributes")),
        other,
    };
    (!suggestions.is_empty()).then_some(suggestions)
}

/// Remove the suggestions block and trim what remains.
#[must_use]
pub fn strip_suggestions(text: &str) -> String {
    SUGGESTION_BLOCK.replace(text, "").trim().to_owned()
}

fn normalize_groups(raw: Option<&Value>) -> Vec<SuggestionGroup> {
    let Some(groups) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    groups
        .iter()
        .filter_map(|group| {
            let options = group.get("options").and_then(Value::as_array)?.clone();
            if options.is_empty() {
                return None;
            }
            let for_text =
                group.get("for").and_then(Value::as_str).unwrap_or_default().to_owned();
            Some(SuggestionGroup { for_text, options })
        })
        .collect()
}
