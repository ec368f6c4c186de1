use crate::utils::text::title_case_field;
use serde_json::Value;

/// Row/column view for field-uniform records. Columns are the union of all
/// record keys in first-seen order.
pub fn table(title: &str, records: &[Value]) -> String {
    let mut out = format!("## {}\n\n", title);
    if records.is_empty() {
        out.push_str("No records found.");
        return out;
    }

    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        if let Some(map) = record.as_object() {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }
    if columns.is_empty() {
        out.push_str("No records found.");
        return out;
    }

    out.push_str(&format!("| {} |\n", columns.join(" | ")));
    out.push_str(&format!(
        "|{}|\n",
        columns.iter().map(|_| " --- ").collect::<Vec<_>>().join("|")
    ));
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| table_cell(record.get(*column).unwrap_or(&Value::Null)))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.trim_end().to_string()
}

fn table_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::Bool(true) => "✓".to_string(),
        Value::Bool(false) => "✗".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        nested => nested.to_string(),
    };
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Section-per-record view. Each record is headed by `title_field` when
/// present, otherwise `Record N`.
pub fn list(title: &str, records: &[Value], title_field: Option<&str>) -> String {
    let mut out = format!("# {}\n", title);
    for (index, record) in records.iter().enumerate() {
        let heading = title_field
            .and_then(|field| record.get(field))
            .filter(|value| !value.is_null())
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("Record {}", index + 1));
        out.push_str(&format!("\n## {}\n\n", heading));
        out.push_str(&field_lines_except(record, title_field));
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// `- **Field Name**: value` for every non-null field of an object.
pub fn field_lines(record: &Value) -> String {
    field_lines_except(record, None)
}

fn field_lines_except(record: &Value, skip: Option<&str>) -> String {
    let Some(map) = record.as_object() else {
        return format!("- {}", list_value(record));
    };
    map.iter()
        .filter(|(key, value)| !value.is_null() && Some(key.as_str()) != skip)
        .map(|(key, value)| format!("- **{}**: {}", title_case_field(key), list_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        nested => format!("\n```json\n{}\n```", pretty_json(nested)),
    }
}

pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_renders_header_and_escapes_pipes() {
        let rendered = table(
            "Customers",
            &[
                json!({"Name": "A|B", "Active": true}),
                json!({"Name": "C", "Active": false, "Tags": ["x"]}),
            ],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "## Customers");
        assert_eq!(lines[2], "| Active | Name | Tags |");
        assert_eq!(lines[4], "| ✓ | A\\|B |  |");
        assert_eq!(lines[5], "| ✗ | C | [\"x\"] |");
    }

    #[test]
    fn empty_table_says_so() {
        assert_eq!(table("Files", &[]), "## Files\n\nNo records found.");
    }

    #[test]
    fn list_uses_title_field_and_yes_no() {
        let rendered = list(
            "Files (1 files)",
            &[json!({"Filename": "a.pdf", "is_public": false, "Note": null})],
            Some("Filename"),
        );
        assert!(rendered.starts_with("# Files (1 files)\n\n## a.pdf"));
        assert!(rendered.contains("- **Is Public**: No"));
        assert!(!rendered.contains("- **Filename**"));
        assert!(!rendered.contains("Note"));
    }

    #[test]
    fn list_falls_back_to_record_number() {
        let rendered = list("Keys", &[json!({"Id": 1}), json!({"Id": 2})], Some("Name"));
        assert!(rendered.contains("## Record 1"));
        assert!(rendered.contains("## Record 2"));
    }

    #[test]
    fn nested_values_render_as_json_blocks() {
        let lines = field_lines(&json!({"trigger": {"table": "Customer"}}));
        assert!(lines.starts_with("- **Trigger**: \n```json\n{"));
        assert!(lines.contains("\"table\": \"Customer\""));
    }
}
