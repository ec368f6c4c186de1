pub mod apikeys;
pub mod events;
pub mod files;
pub mod tables;
pub mod user;

use crate::utils::pagination::PaginationInfo;
use serde_json::Value;

const HEURISTIC_NOTE: &str = "has_more is estimated from a full page; the next page may be empty";

/// Pagination fields plus the page's records under `key`.
pub(crate) fn list_payload(pagination: &PaginationInfo, key: &str, records: Vec<Value>) -> Value {
    let mut data = pagination.to_fields();
    if pagination.has_more && pagination.is_heuristic() {
        data.insert(
            "pagination_note".to_string(),
            Value::String(HEURISTIC_NOTE.to_string()),
        );
    }
    data.insert(key.to_string(), Value::Array(records));
    Value::Object(data)
}

/// First non-null value among `keys`, or `null`.
pub(crate) fn first_present(source: &Value, keys: &[&str]) -> Value {
    keys.iter()
        .filter_map(|key| source.get(*key))
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

pub(crate) fn success_banner(text: &str) -> String {
    format!("✅ **{}**", text)
}

/// `Title (3 records)` or `Title (3 of 10 records)`.
pub(crate) fn counted_title(title: &str, pagination: &PaginationInfo, noun: &str) -> String {
    let noun = if noun.is_empty() {
        String::new()
    } else {
        format!(" {}", noun)
    };
    match pagination.total {
        Some(total) => format!("{} ({} of {}{})", title, pagination.count, total, noun),
        None => format!("{} ({}{})", title, pagination.count, noun),
    }
}
