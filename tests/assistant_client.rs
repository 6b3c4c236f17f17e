mod common;

use common::{assistant_settings, spawn_app, token};
use mektep::assistant::AssistantClient;
use mektep::error::{AppError, AssistantError};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_thread(server: &MockServer, run_status: &str) {
    Mock::given(method("POST"))
        .and(path("/openai/threads"))
        .and(header("api-key", "test-key"))
        .and(query_param("api-version", "2024-05-01-preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/threads/thread_1/messages"))
        .and(body_partial_json(json!({"role": "user"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/threads/thread_1/runs"))
        .and(body_partial_json(json!({"assistant_id": "asst_test"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "queued"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openai/threads/thread_1/runs/run_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": run_status})),
        )
        .mount(server)
        .await;
}

async fn mount_messages(server: &MockServer, messages: Value) {
    Mock::given(method("GET"))
        .and(path("/openai/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": messages })))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> AssistantClient {
    AssistantClient::new(&assistant_settings(server.uri()), reqwest::Client::new())
}

#[tokio::test]
async fn summarize_returns_first_assistant_text() {
    let server = MockServer::start().await;
    mount_thread(&server, "completed").await;
    mount_messages(
        &server,
        json!([
            {"role": "assistant", "content": [{"type": "text", "text": {"value": "  Short summary.  "}}]},
            {"role": "user", "content": [{"type": "text", "text": {"value": "lecture notes"}}]}
        ]),
    )
    .await;

    let summary = client(&server)
        .summarize_text("A long lecture about photosynthesis")
        .await
        .expect("Summary failed");

    assert_eq!(summary, "Short summary.");
}

#[tokio::test]
async fn failed_run_is_reported() {
    let server = MockServer::start().await;
    mount_thread(&server, "failed").await;

    let result = client(&server).summarize_text("text").await;

    match result {
        Err(AppError::Assistant(AssistantError::RunFailed(status))) => assert_eq!(status, "failed"),
        other => panic!("expected RunFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn run_that_never_finishes_times_out() {
    let server = MockServer::start().await;
    mount_thread(&server, "in_progress").await;

    let result = client(&server).summarize_text("text").await;

    assert!(matches!(
        result,
        Err(AppError::Assistant(AssistantError::TimedOut(3)))
    ));
}

#[tokio::test]
async fn missing_assistant_reply_is_empty_response() {
    let server = MockServer::start().await;
    mount_thread(&server, "completed").await;
    mount_messages(
        &server,
        json!([{"role": "user", "content": [{"type": "text", "text": {"value": "lecture notes"}}]}]),
    )
    .await;

    let result = client(&server).summarize_text("text").await;

    assert!(matches!(
        result,
        Err(AppError::Assistant(AssistantError::EmptyResponse))
    ));
}

#[tokio::test]
async fn upstream_error_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client(&server).summarize_text("text").await;

    assert!(matches!(
        result,
        Err(AppError::Assistant(AssistantError::Request(_)))
    ));
}

// --- HTTP surface ---

#[tokio::test]
async fn summarize_endpoint_returns_summary() {
    let app = spawn_app().await;
    mount_thread(&app.assistant_server, "completed").await;
    mount_messages(
        &app.assistant_server,
        json!([{"role": "assistant", "content": [{"type": "text", "text": {"value": "Summary"}}]}]),
    )
    .await;
    let pair = app.register("a@x.com", "+77010000001", "pw1").await;

    let response = app
        .client
        .post(app.url("/v1/ai/summarize"))
        .bearer_auth(token(&pair, "access_token"))
        .json(&json!({"text": "Some study material"}))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["summary"], "Summary");
}

#[tokio::test]
async fn summarize_endpoint_maps_assistant_failure_to_502() {
    let app = spawn_app().await;
    mount_thread(&app.assistant_server, "failed").await;
    let pair = app.register("a@x.com", "+77010000001", "pw1").await;

    let response = app
        .client
        .post(app.url("/v1/ai/summarize"))
        .bearer_auth(token(&pair, "access_token"))
        .json(&json!({"text": "Some study material"}))
        .send()
        .await
        .unwrap();

    assert_eq!(502, response.status().as_u16());
}

#[tokio::test]
async fn summarize_endpoint_rejects_anonymous_and_empty_requests() {
    let app = spawn_app().await;

    let anonymous = app
        .client
        .post(app.url("/v1/ai/summarize"))
        .json(&json!({"text": "Some study material"}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, anonymous.status().as_u16());

    let pair = app.register("a@x.com", "+77010000001", "pw1").await;
    let empty = app
        .client
        .post(app.url("/v1/ai/summarize"))
        .bearer_auth(token(&pair, "access_token"))
        .json(&json!({"text": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, empty.status().as_u16());
}
