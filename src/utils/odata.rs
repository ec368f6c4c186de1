use serde_json::Value;

const OPERATORS: &[(&str, &str)] = &[
    ("__gte", "ge"),
    ("__lte", "le"),
    ("__gt", "gt"),
    ("__ge", "ge"),
    ("__lt", "lt"),
    ("__le", "le"),
    ("__ne", "ne"),
    ("__contains", "contains"),
    ("__startswith", "startswith"),
    ("__endswith", "endswith"),
];

/// `O'Brien` → `'O''Brien'`.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote_literal(text),
        nested => quote_literal(&nested.to_string()),
    }
}

fn split_operator(key: &str) -> (&str, &str) {
    OPERATORS
        .iter()
        .find_map(|(suffix, op)| key.strip_suffix(suffix).map(|field| (field, *op)))
        .unwrap_or((key, "eq"))
}

/// Renders `[("Status", "Active"), ("Amount__gt", 100)]` as
/// `Status eq 'Active' and Amount gt 100`, keeping the given order.
/// String functions use call syntax.
pub fn build_query_filter(fields: &[(&str, Value)]) -> Option<String> {
    let clauses: Vec<String> = fields
        .iter()
        .map(|(key, value)| {
            let (field, op) = split_operator(key);
            match op {
                "contains" | "startswith" | "endswith" => {
                    format!("{}({},{})", op, field, literal(value))
                }
                _ => format!("{} {} {}", field, op, literal(value)),
            }
        })
        .collect();
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" and "))
    }
}
