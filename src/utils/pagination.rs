use serde::Serialize;
use serde_json::Value;

/// Page metadata shared by every listing tool.
///
/// Three upstream contracts are folded into one shape:
/// a continuation link (`nextLink`), an exact total (`@odata.count`), or
/// neither. Without either signal a full page is read as "more may exist";
/// that is a heuristic and reports `has_more` for a page that exactly
/// exhausts the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub total: Option<u64>,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
    pub next_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

impl PaginationInfo {
    pub fn infer(
        total: Option<u64>,
        next_link: Option<String>,
        count: u64,
        offset: u64,
        limit: u64,
    ) -> Self {
        let next_link = next_link.filter(|link| !link.trim().is_empty());
        let has_more = if next_link.is_some() {
            true
        } else if let Some(total) = total {
            total > offset.saturating_add(count)
        } else {
            count == limit
        };
        Self {
            total,
            count,
            offset,
            limit,
            has_more,
            next_offset: has_more.then(|| offset.saturating_add(count)),
            next_link,
        }
    }

    /// True when the total-unknown heuristic produced `has_more`.
    pub fn is_heuristic(&self) -> bool {
        self.total.is_none() && self.next_link.is_none()
    }

    /// Serialized fields, for merging into a tool's JSON payload.
    pub fn to_fields(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// `**Pagination**: Showing records 1-20 of 45 | More records available | Next offset: 20`
    pub fn footer(&self) -> String {
        let start = if self.count == 0 { self.offset } else { self.offset.saturating_add(1) };
        let end = self.offset.saturating_add(self.count);
        let mut footer = format!("**Pagination**: Showing records {}-{}", start, end);
        if let Some(total) = self.total {
            footer.push_str(&format!(" of {}", total));
        }
        if self.has_more {
            footer.push_str(" | More records available");
            match (&self.next_link, self.next_offset) {
                (Some(link), _) => footer.push_str(&format!(" | Next link: {}", link)),
                (None, Some(next)) => footer.push_str(&format!(" | Next offset: {}", next)),
                (None, None) => {}
            }
        } else {
            footer.push_str(" | No more records");
        }
        footer
    }
}

/// One page of records pulled out of a raw list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub count: u64,
    pub total: Option<u64>,
    pub next_link: Option<String>,
}

impl Page {
    /// Accepts a bare array or an OData-style object
    /// (`value`, `count`, `@odata.count`, `nextLink`/`@odata.nextLink`).
    pub fn from_response(response: &Value) -> Self {
        match response {
            Value::Array(items) => Self {
                count: items.len() as u64,
                records: items.clone(),
                total: None,
                next_link: None,
            },
            Value::Object(map) => {
                let records = map
                    .get("value")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let count = map
                    .get("count")
                    .and_then(Value::as_u64)
                    .unwrap_or(records.len() as u64);
                let total = map.get("@odata.count").and_then(Value::as_u64);
                let next_link = ["nextLink", "@odata.nextLink"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string);
                Self {
                    records,
                    count,
                    total,
                    next_link,
                }
            }
            _ => Self {
                records: Vec::new(),
                count: 0,
                total: None,
                next_link: None,
            },
        }
    }

    pub fn pagination(&self, offset: u64, limit: u64) -> PaginationInfo {
        PaginationInfo::infer(self.total, self.next_link.clone(), self.count, offset, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_known_drives_has_more() {
        let page = PaginationInfo::infer(Some(45), None, 20, 0, 20);
        assert!(page.has_more);
        assert_eq!(page.next_offset, Some(20));

        let last = PaginationInfo::infer(Some(45), None, 5, 40, 20);
        assert!(!last.has_more);
        assert_eq!(last.next_offset, None);

        let exact = PaginationInfo::infer(Some(40), None, 20, 20, 20);
        assert!(!exact.has_more);
    }

    #[test]
    fn full_page_heuristic_without_total() {
        let full = PaginationInfo::infer(None, None, 2, 0, 2);
        assert!(full.has_more);
        assert_eq!(full.next_offset, Some(2));
        assert!(full.is_heuristic());

        let partial = PaginationInfo::infer(None, None, 1, 0, 2);
        assert!(!partial.has_more);
        assert_eq!(partial.next_offset, None);
    }

    #[test]
    fn next_link_wins_over_total() {
        let page = PaginationInfo::infer(
            Some(3),
            Some("https://api/next?page=2".to_string()),
            3,
            0,
            20,
        );
        assert!(page.has_more);
        assert_eq!(page.next_link.as_deref(), Some("https://api/next?page=2"));
        assert_eq!(page.next_offset, Some(3));
        assert!(page.footer().ends_with("| Next link: https://api/next?page=2"));
    }

    #[test]
    fn blank_next_link_is_ignored() {
        let page = PaginationInfo::infer(None, Some("  ".to_string()), 1, 0, 20);
        assert!(!page.has_more);
        assert!(page.next_link.is_none());
    }

    #[test]
    fn next_offset_present_iff_has_more() {
        for total in [None, Some(0), Some(10), Some(100)] {
            for count in [0u64, 5, 10] {
                for offset in [0u64, 10, 90] {
                    let info = PaginationInfo::infer(total, None, count, offset, 10);
                    assert_eq!(info.has_more, info.next_offset.is_some());
                }
            }
        }
    }

    #[test]
    fn serialized_fields_keep_unknown_total_as_null() {
        let fields = PaginationInfo::infer(None, None, 2, 0, 2).to_fields();
        assert_eq!(fields.get("total"), Some(&Value::Null));
        assert_eq!(fields.get("next_offset"), Some(&json!(2)));
        assert!(!fields.contains_key("next_link"));
    }

    #[test]
    fn footer_reports_range_and_total() {
        let info = PaginationInfo::infer(Some(45), None, 20, 20, 20);
        assert_eq!(
            info.footer(),
            "**Pagination**: Showing records 21-40 of 45 | More records available | Next offset: 40"
        );
        let done = PaginationInfo::infer(None, None, 3, 0, 20);
        assert_eq!(
            done.footer(),
            "**Pagination**: Showing records 1-3 | No more records"
        );
    }

    #[test]
    fn footer_saturates_at_huge_offsets() {
        let info = PaginationInfo::infer(None, None, 2, u64::MAX - 1, 2);
        assert!(info
            .footer()
            .starts_with(&format!("**Pagination**: Showing records {}-{}", u64::MAX, u64::MAX)));
    }

    #[test]
    fn page_reads_array_and_object_shapes() {
        let array = Page::from_response(&json!([{"Id": 1}, {"Id": 2}]));
        assert_eq!(array.count, 2);
        assert!(array.total.is_none());

        let object = Page::from_response(&json!({
            "value": [{"Id": 1}],
            "@odata.count": 7,
            "@odata.nextLink": "next-token",
        }));
        assert_eq!(object.count, 1);
        assert_eq!(object.total, Some(7));
        assert_eq!(object.next_link.as_deref(), Some("next-token"));

        let counted = Page::from_response(&json!({"value": [], "count": 4}));
        assert_eq!(counted.count, 4);
        assert!(Page::from_response(&json!("odd")).records.is_empty());
    }
}
