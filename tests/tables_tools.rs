mod common;
use common::{app_for, call_json, call_text};

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn full_page_query_reports_more_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tables/Customer"))
        .and(query_param("$top", "2"))
        .and(header("Authorization", "APIKey test-key-0042"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"RecordID": 1, "Name": "Acme"}, {"RecordID": 2, "Name": "Globex"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (envelope, is_error) =
        call_json(&app, "method_tables_query", json!({"table": "Customer", "top": 2})).await;

    assert!(!is_error);
    assert_eq!(envelope["success"], json!(true));
    let data = &envelope["data"];
    assert_eq!(data["count"], json!(2));
    assert_eq!(data["has_more"], json!(true));
    assert_eq!(data["next_offset"], json!(2));
    assert!(data["pagination_note"].is_string());
    assert_eq!(data["records"][1]["Name"], json!("Globex"));
}

#[tokio::test]
async fn known_total_drives_markdown_footer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tables/Invoice"))
        .and(query_param("$skip", "20"))
        .and(query_param("$filter", "Balance gt 100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"RefNumber": "INV-21", "Paid": false}],
            "@odata.count": 21
        })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (text, is_error) = call_text(
        &app,
        "method_tables_query",
        json!({
            "table": "Invoice",
            "filter": "Balance gt 100",
            "skip": 20,
            "response_format": "markdown"
        }),
    )
    .await;

    assert!(!is_error, "{}", text);
    assert!(text.starts_with("## Query Results: Invoice (1 of 21 records)"), "{}", text);
    assert!(text.contains("| ✗ | INV-21 |"), "{}", text);
    assert!(text.ends_with("**Pagination**: Showing records 21-21 of 21 | No more records"));
}

#[tokio::test]
async fn empty_markdown_query_says_so() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tables/Vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (text, _) = call_text(
        &app,
        "method_tables_query",
        json!({"table": "Vendor", "response_format": "markdown"}),
    )
    .await;
    assert_eq!(text, "# Query Results: Vendor\n\nNo records found matching the query.");
}

#[tokio::test]
async fn create_sends_related_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tables/Estimate"))
        .and(body_json(json!({
            "Customer": "Acme",
            "RelatedRecords": [{"Item": "Widget", "Qty": 2}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"RecordID": 77})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (envelope, is_error) = call_json(
        &app,
        "method_tables_create",
        json!({
            "table": "Estimate",
            "fields": {"Customer": "Acme"},
            "related_records": [{"Item": "Widget", "Qty": 2}]
        }),
    )
    .await;

    assert!(!is_error);
    assert_eq!(envelope["message"], json!("Record created successfully"));
    assert_eq!(envelope["data"]["RecordID"], json!(77));
}

#[tokio::test]
async fn delete_of_missing_record_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/tables/Customer/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "Record 999 does not exist"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (envelope, is_error) = call_json(
        &app,
        "method_tables_delete",
        json!({"table": "Customer", "record_id": "999"}),
    )
    .await;

    assert!(is_error);
    assert_eq!(envelope["success"], json!(false));
    let error = envelope["error"].as_str().expect("error text");
    assert!(error.starts_with("Error: Resource not found - Record 999 does not exist"), "{}", error);
    assert!(error.contains("Suggestion:"));
}

#[tokio::test]
async fn path_traversal_never_reaches_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (text, is_error) = call_text(
        &app,
        "method_tables_get",
        json!({"table": "../admin", "record_id": "1", "response_format": "markdown"}),
    )
    .await;
    assert!(is_error);
    assert!(text.starts_with("Error: "), "{}", text);
}
