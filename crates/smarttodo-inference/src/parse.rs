//! Tolerant parsing of model responses.
//!
//! Models return anything from clean JSON to JSON wrapped in prose, code
//! fences or `<think>` blocks. Extraction tries the whole text, then every
//! `{` in text order, and keeps the first value that deserializes to a JSON
//! object. Fenced blocks need no special case: the closing fence is trailing
//! text after the object.
//!
//! Field parsing is per field: a bad score does not discard a good deadline.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use smarttodo_core::{defaults, Suggestion, SuggestionOutcome};

pub(crate) type JsonObject = Map<String, Value>;

/// Remove `<think>...</think>` blocks. An unclosed block swallows the rest.
pub fn strip_thinking(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        let after = &rest[start + "<think>".len()..];
        match after.find("</think>") {
            Some(end) => rest = &after[end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn as_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Find the first JSON object in free text.
pub fn extract_json_object(text: &str) -> Option<JsonObject> {
    let text = strip_thinking(text);

    if let Some(map) = as_object(&text) {
        return Some(map);
    }

    // Stream-deserialize from every brace so trailing prose is ignored.
    for (idx, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            return Some(map);
        }
    }

    None
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// First value whose key matches one of `aliases`, ignoring case, `_` and `-`.
pub(crate) fn lookup<'a>(obj: &'a JsonObject, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        let wanted = normalize_key(alias);
        obj.iter()
            .find(|(k, v)| normalize_key(k) == wanted && !v.is_null())
            .map(|(_, v)| v)
    })
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// A score in `0..=100`, rounded. Anything else is absent.
pub fn parse_score(value: &Value) -> Option<i32> {
    let n = number_of(value)?;
    let rounded = n.round();
    let range = f64::from(defaults::PRIORITY_MIN)..=f64::from(defaults::PRIORITY_MAX);
    range.contains(&rounded).then_some(rounded as i32)
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Deadline on or after `today`. Past dates are dropped.
pub(crate) fn parse_deadline(value: &Value, today: NaiveDate) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(parse_date)
        .filter(|date| *date >= today)
}

/// Accepts an array of strings or a comma-separated string.
pub fn parse_string_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(String::from),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(String::from).collect(),
        _ => Vec::new(),
    };

    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|s| s.trim().trim_matches('"').trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

pub(crate) fn parse_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

const SCORE_KEYS: &[&str] = &["priority_score", "score", "urgency_score"];
const LABEL_KEYS: &[&str] = &["priority_label", "tier", "priority_tier"];
const DEADLINE_KEYS: &[&str] = &["deadline", "suggested_deadline", "due_date", "due"];
const CATEGORY_KEYS: &[&str] = &["categories", "suggested_categories", "category", "tags"];
const DESCRIPTION_KEYS: &[&str] = &["enhanced_description", "description", "details"];

/// Turn a raw model response into a suggestion.
pub fn parse_suggestion(text: &str, today: NaiveDate) -> SuggestionOutcome {
    let Some(obj) = extract_json_object(text) else {
        return SuggestionOutcome::unavailable("response contained no JSON object");
    };

    // `priority` is either the score or the tier label depending on the model.
    let priority = lookup(&obj, &["priority"]);
    let priority_score = lookup(&obj, SCORE_KEYS)
        .and_then(parse_score)
        .or_else(|| priority.and_then(parse_score));
    let priority_label = lookup(&obj, LABEL_KEYS)
        .or_else(|| priority.filter(|v| number_of(v).is_none()))
        .and_then(parse_text)
        .map(|s| s.to_lowercase());

    let categories = lookup(&obj, CATEGORY_KEYS)
        .map(parse_string_list)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| name.chars().count() <= defaults::CATEGORY_NAME_MAX_LEN)
        .collect();

    let suggestion = Suggestion {
        priority_score,
        priority_label,
        deadline: lookup(&obj, DEADLINE_KEYS).and_then(|v| parse_deadline(v, today)),
        categories,
        enhanced_description: lookup(&obj, DESCRIPTION_KEYS).and_then(parse_text),
    };

    if suggestion.is_empty() {
        SuggestionOutcome::unavailable("response contained no usable fields")
    } else {
        SuggestionOutcome::Suggested(suggestion)
    }
}
