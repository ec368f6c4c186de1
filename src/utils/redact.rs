use crate::constants::limits::MASK_VISIBLE_CHARS;
use crate::utils::text::truncate_utf8_prefix;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_REDACTION: &str = "[REDACTED]";
const MASK_CHAR: char = '•';
const MASK_WIDTH: usize = 8;

static SENSITIVE_HEADER_KEYS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-api-key",
    "cookie",
];

static INLINE_CREDENTIALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(APIKey|Bearer)\s+[A-Za-z0-9._~+/=-]{4,}").expect("inline credential regex")
});

/// Shows only the last few characters of a credential: `••••••••1234`.
pub fn mask_secret(value: &str) -> String {
    let trimmed = value.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= MASK_VISIBLE_CHARS {
        return MASK_CHAR.to_string().repeat(MASK_WIDTH);
    }
    let tail: String = chars[chars.len() - MASK_VISIBLE_CHARS..].iter().collect();
    format!("{}{}", MASK_CHAR.to_string().repeat(MASK_WIDTH), tail)
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_lowercase().replace('-', "_");
    if normalized.is_empty() {
        return false;
    }
    normalized == "authorization"
        || normalized.contains("apikey")
        || normalized.contains("api_key")
        || normalized.contains("secret")
        || normalized.contains("token")
        || normalized.contains("password")
}

/// Replaces `APIKey <value>` / `Bearer <value>` occurrences and truncates.
pub fn redact_text(value: &str, max_bytes: usize) -> String {
    let replaced = INLINE_CREDENTIALS.replace_all(value, format!("$1 {}", DEFAULT_REDACTION));
    if replaced.len() <= max_bytes {
        return replaced.into_owned();
    }
    format!("{}...", truncate_utf8_prefix(&replaced, max_bytes))
}

/// Header map suitable for debug logs.
pub fn redact_headers(headers: &BTreeMap<String, String>) -> Value {
    let mut out = serde_json::Map::new();
    for (key, value) in headers {
        let lowered = key.to_lowercase();
        let shown = if SENSITIVE_HEADER_KEYS.contains(&lowered.as_str()) {
            DEFAULT_REDACTION.to_string()
        } else {
            value.clone()
        };
        out.insert(key.clone(), Value::String(shown));
    }
    Value::Object(out)
}

/// Masks credential-looking fields of a record in place, recursing into
/// nested objects and arrays.
pub fn mask_record_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive_key(key) {
                    if let Some(text) = entry.as_str() {
                        *entry = Value::String(mask_secret(text));
                        continue;
                    }
                }
                mask_record_secrets(entry);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_record_secrets),
        _ => {}
    }
}
