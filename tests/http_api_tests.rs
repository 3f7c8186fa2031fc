/// End-to-end tests of the HTTP surface, driven through the router without a socket
mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::*;
use loan_scoring_api::routes::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_for(llm_base_url: String) -> Router {
    build_router(create_state(create_test_config(llm_base_url)), false).unwrap()
}

/// Router whose language model is never reachable.
fn offline_router() -> Router {
    router_for("http://127.0.0.1:9".to_string())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn scoring_payload() -> Value {
    json!({
        "monthly_income": 3000,
        "monthly_expenses": 1000,
        "collateral": true,
        "business_type": "Established",
        "years_in_business": 7,
        "loan_amount": 1200,
        "payback_period": 12
    })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(
        offline_router(),
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_get_on_post_route_is_405() {
    let response = offline_router()
        .oneshot(
            Request::get("/api/preliminary-score")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
}

#[tokio::test]
async fn test_post_on_settings_read_is_405() {
    let response = offline_router()
        .oneshot(post_json("/api/settings", &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET");
}

#[tokio::test]
async fn test_empty_body_is_400() {
    let request = Request::post("/api/final-score")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(offline_router(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Scoring inputs are required");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let request = Request::post("/api/preliminary-score")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"monthly_income\": "))
        .unwrap();
    let (status, _) = send(offline_router(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preliminary_score_defaults_to_flat_ladder() {
    let (status, body) = send(
        offline_router(),
        post_json("/api/preliminary-score", &scoring_payload()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preliminary_score"], 85.0);
    assert_eq!(body["strategy"], "flat_point_ladder");
    assert_eq!(body["risk_category"], "Very low risk");
}

#[tokio::test]
async fn test_weighted_preliminary_score_has_no_category() {
    let mut payload = scoring_payload();
    payload["strategy"] = json!("weighted_ratio_ladder");

    let (status, body) = send(
        offline_router(),
        post_json("/api/preliminary-score", &payload),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!((body["preliminary_score"].as_f64().unwrap() - 17.55).abs() < 1e-9);
    assert!(body.get("risk_category").map_or(true, Value::is_null));
}

#[tokio::test]
async fn test_negative_input_is_400() {
    let mut payload = scoring_payload();
    payload["loan_amount"] = json!(-5);

    let (status, _) = send(
        offline_router(),
        post_json("/api/preliminary-score", &payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_final_score() {
    let mut payload = scoring_payload();
    payload["fcb_score"] = json!("Good");
    payload["collateral_validity"] = json!(true);
    payload["running_loans"] = json!(false);
    payload["repayment_history"] = json!("Good");

    let (status, body) = send(offline_router(), post_json("/api/final-score", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert!((body["final_score"].as_f64().unwrap() - 47.55).abs() < 1e-9);
    assert_eq!(body["risk_category"], "Moderate risk");
}

#[tokio::test]
async fn test_final_score_unknown_rating_is_400() {
    let mut payload = scoring_payload();
    payload["fcb_score"] = json!("Excellent");
    payload["collateral_validity"] = json!(true);
    payload["running_loans"] = json!(false);
    payload["repayment_history"] = json!("Good");

    let (status, _) = send(offline_router(), post_json("/api/final-score", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cash_loan_report_returns_context_id() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Score: 68")))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        router_for(mock_server.uri()),
        post_json("/api/cash-loan", &json!({ "loanDetails": cash_loan_details() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"], "Score: 68");
    assert!(!body["contextId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_payg_report_keeps_supplied_context_id() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("PAYG report")))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        router_for(mock_server.uri()),
        post_json(
            "/api/payg-loan",
            &json!({ "loanDetails": payg_loan_details(), "contextId": "client-42" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contextId"], "client-42");
}

#[tokio::test]
async fn test_report_upstream_failure_is_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        router_for(mock_server.uri()),
        post_json("/api/cash-loan", &json!({ "loanDetails": cash_loan_details() })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_report_with_missing_field_is_400() {
    let mut details = cash_loan_details();
    details.as_object_mut().unwrap().remove("monthlyIncome");

    let (status, _) = send(
        offline_router(),
        post_json("/api/cash-loan", &json!({ "loanDetails": details })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_typed_report_requires_loan_type() {
    let (status, body) = send(
        offline_router(),
        post_json("/api/report", &json!({ "loanDetails": cash_loan_details() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "loanType is required");
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = offline_router();

    let (status, _) = send(
        app.clone(),
        Request::get("/api/settings").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let weights = json!({
        "income_to_expense_ratio": 25,
        "collateral": 25,
        "business_type": 15,
        "years_in_business": 15,
        "loan_amount": 10,
        "payback_period": 10
    });
    let (status, body) = send(app.clone(), post_json("/api/save-settings", &weights)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings saved successfully!");

    let (status, body) = send(
        app,
        Request::get("/api/settings").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collateral"], 25.0);
    assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn test_settings_not_summing_to_100_rejected() {
    let weights = json!({
        "income_to_expense_ratio": 50,
        "collateral": 50,
        "business_type": 15,
        "years_in_business": 15,
        "loan_amount": 10,
        "payback_period": 10
    });
    let (status, _) = send(offline_router(), post_json("/api/save-settings", &weights)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart_request(uri: &str, field: &str, file_name: &str, content: &str) -> Request<Body> {
    let boundary = "loan-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary,
        field = field,
        file_name = file_name,
        content = content,
    );
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_analyze_document_upload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"analysis": "ID card", "clientName": "Tariro Moyo", "dob": "1988-04-12"}"#,
        )))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        router_for(mock_server.uri()),
        multipart_request("/api/analyze-document", "file", "id.txt", "Name: Tariro Moyo"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientName"], "Tariro Moyo");
    assert_eq!(body["dob"], "1988-04-12");
}

#[tokio::test]
async fn test_analyze_document_without_file_field_is_400() {
    let (status, body) = send(
        offline_router(),
        multipart_request("/api/analyze-document", "other", "id.txt", "hello"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

fn limited_router() -> Router {
    build_router(
        create_state(create_test_config("http://127.0.0.1:9".to_string())),
        true,
    )
    .unwrap()
}

fn scoring_request_from(client_ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/preliminary-score")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(scoring_payload().to_string()))
        .unwrap()
}

async fn admitted_count(app: &Router, client_ip: &str, attempts: usize) -> (usize, usize) {
    let mut admitted = 0;
    let mut limited = 0;
    for _ in 0..attempts {
        let status = app
            .clone()
            .oneshot(scoring_request_from(client_ip))
            .await
            .unwrap()
            .status();
        match status {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    (admitted, limited)
}

#[tokio::test]
async fn test_rate_limit_refills_ten_per_second() {
    let app = limited_router();

    let (admitted, limited) = admitted_count(&app, "10.0.0.1", 40).await;
    assert!(admitted >= 20);
    assert!(limited > 0);

    // 1.5 s at 10 req/s refills 15 tokens
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let (admitted, limited) = admitted_count(&app, "10.0.0.1", 10).await;
    assert_eq!(admitted, 10);
    assert_eq!(limited, 0);
}

#[tokio::test]
async fn test_rate_limit_is_per_client_and_skips_health() {
    let app = limited_router();

    let (_, limited) = admitted_count(&app, "10.0.0.2", 40).await;
    assert!(limited > 0);

    let (admitted, _) = admitted_count(&app, "10.0.0.3", 5).await;
    assert_eq!(admitted, 5);

    let health = Request::get("/health")
        .header("x-forwarded-for", "10.0.0.2")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(health).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
