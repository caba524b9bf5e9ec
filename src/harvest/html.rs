//! Extraction of server-rendered list state
//!
//! The rendered list page embeds its first batch of records in a script:
//!
//! ```text
//! <script>window.$G = {"preloadedState": {"data": {"code": "200", "data": {"data": [...]}}}};</script>
//! ```
//!
//! `preloadedState.data` has the same envelope shape as the list API.

use scraper::{Html, Selector};
use serde_json::{Deserializer, Value};

const STATE_ASSIGNMENT: &str = "window.$G";
const STATE_KEY: &str = "preloadedState";

/// Finds and parses the `preloadedState` object of a rendered page
///
/// # Returns
///
/// * `Some(Value)` - The `preloadedState` value
/// * `None` - No script assigns it, or its JSON is unreadable
pub fn extract_preloaded_state(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script").ok()?;

    document
        .select(&script_selector)
        .map(|element| element.text().collect::<String>())
        .filter(|text| text.contains(STATE_ASSIGNMENT) && text.contains(STATE_KEY))
        .find_map(|text| parse_assignment(&text))
        .and_then(|mut state| state.get_mut(STATE_KEY).map(Value::take))
}

/// The list envelope inside a preloaded state
pub fn envelope_of(state: &Value) -> Option<&Value> {
    state.get("data").filter(|v| v.is_object())
}

/// Parses the first JSON value after `window.$G =`
fn parse_assignment(script: &str) -> Option<Value> {
    let start = script.find(STATE_ASSIGNMENT)? + STATE_ASSIGNMENT.len();
    let rest = script[start..].trim_start().strip_prefix('=')?;

    match Deserializer::from_str(rest).into_iter::<Value>().next() {
        Some(Ok(value)) if value.is_object() => Some(value),
        Some(Err(e)) => {
            tracing::warn!("Failed to parse preloaded state: {}", e);
            None
        }
        _ => None,
    }
}
