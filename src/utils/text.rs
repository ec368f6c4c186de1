pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// `link_record_id` → `Link Record Id`. Existing capitals are kept, so
/// `CreatedDate` stays `CreatedDate`.
pub fn title_case_field(field: &str) -> String {
    field
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Text form of a scalar JSON value: strings unquoted, everything else as JSON.
pub fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_utf8_prefix_does_not_split_utf8() {
        assert_eq!(truncate_utf8_prefix("hello", 3), "hel");
        assert_eq!(truncate_utf8_prefix("a✓b", 2), "a");
        assert_eq!(truncate_utf8_prefix("a✓b", 4), "a✓");
    }

    #[test]
    fn title_case_field_splits_underscores() {
        assert_eq!(title_case_field("link_record_id"), "Link Record Id");
        assert_eq!(title_case_field("CreatedDate"), "CreatedDate");
        assert_eq!(title_case_field("name"), "Name");
    }

    #[test]
    fn scalar_text_unquotes_strings() {
        assert_eq!(scalar_text(&serde_json::json!("abc")), "abc");
        assert_eq!(scalar_text(&serde_json::json!(5)), "5");
        assert_eq!(scalar_text(&serde_json::json!(true)), "true");
        assert_eq!(scalar_text(&serde_json::Value::Null), "");
    }
}
