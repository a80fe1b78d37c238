//! API endpoint integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parley::api::{self, ApiState};
use parley::chat::ChatClient;
use parley::{Error, TurnPipeline};
use tower::ServiceExt;

mod common;
use common::{FakeSynthesizer, MockChatServer, RecordingBackoff, ScriptedCapture};

/// Build a test API router around a mock chat endpoint
fn build_test_router(server: &MockChatServer, capture: ScriptedCapture) -> Router {
    let chat = ChatClient::new(&server.chat_config())
        .unwrap()
        .with_backoff(Arc::new(RecordingBackoff::default()));
    let pipeline = TurnPipeline::new(
        Arc::new(capture),
        Arc::new(chat),
        Arc::new(FakeSynthesizer::default()),
    );

    api::router(Arc::new(ApiState::new(pipeline, Duration::from_millis(100))))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post(app: &Router, uri: &str, json: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn onboard(app: &Router, name: &str) -> serde_json::Value {
    let (status, json) = post(app, "/api/session/name", serde_json::json!({ "name": name })).await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_index_page_is_served() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Speech Chat Bot"));
    assert!(html.contains("/api/turn/record"));
}

#[tokio::test]
async fn test_index_page_sequences_reply_audio() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();

    // A new turn silences the previous reply before the server starts listening
    let post = html.find("async function post").unwrap();
    let stop = post + html[post..].find("stopAudio();").unwrap();
    let fetch = post + html[post..].find("await fetch(path").unwrap();
    assert!(stop < fetch);

    // Recording reopens only once the reply has finished playing
    assert!(html.contains(r#"player.addEventListener("ended", audioDone)"#));
    assert!(html.contains(r#"player.addEventListener("error", audioDone)"#));
    assert!(html.contains(r#"if (speaking) $("record").disabled = true;"#));
}

#[tokio::test]
async fn test_session_starts_awaiting_name() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let (status, json) = get(&app, "/api/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phase"], "awaiting_name");
    assert!(json.get("user_name").is_none());
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let (status, json) = post(&app, "/api/session/name", serde_json::json!({ "name": "   " })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["session"]["phase"], "awaiting_name");
    assert_eq!(json["statuses"][0]["kind"], "error");
    assert_eq!(json["statuses"][0]["message"], "Please enter your name to begin.");
    assert!(json.get("audio").is_none());
}

#[tokio::test]
async fn test_name_onboards_and_speaks_welcome() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let json = onboard(&app, "ada").await;

    let welcome = "Welcome, Ada. This is Speech Chat Bot, your professional voice assistant.";
    assert_eq!(json["session"]["phase"], "onboarded");
    assert_eq!(json["session"]["user_name"], "Ada");
    assert_eq!(json["response"], welcome);
    assert_eq!(json["audio"]["mime_type"], "audio/mp3");
    assert_eq!(json["audio"]["autoplay"], true);

    let audio = STANDARD
        .decode(json["audio"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, FakeSynthesizer::audio_for(welcome));

    // Name is set exactly once
    let (status, json) = post(&app, "/api/session/name", serde_json::json!({ "name": "Bob" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["session"]["user_name"], "Ada");
}

#[tokio::test]
async fn test_text_turn_requires_onboarding() {
    let server = MockChatServer::start(&[]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));

    let (status, _json) = post(&app, "/api/turn/text", serde_json::json!({ "text": "Hello" })).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_text_turn_returns_reply_audio() {
    let server = MockChatServer::start(&[(200, "Hi Ada, how can I help?")]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));
    onboard(&app, "Ada").await;

    let (status, json) = post(&app, "/api/turn/text", serde_json::json!({ "text": "Hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Hi Ada, how can I help?");
    assert_eq!(json["statuses"][0]["kind"], "processing");
    assert_eq!(json["statuses"][1]["kind"], "response");

    let audio = STANDARD
        .decode(json["audio"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, FakeSynthesizer::audio_for("Hi Ada, how can I help?"));
}

#[tokio::test]
async fn test_chat_failure_is_reported_without_audio() {
    let server = MockChatServer::start(&[(500, "boom")]).await;
    let app = build_test_router(&server, ScriptedCapture::new(vec![]));
    onboard(&app, "Ada").await;

    let (status, json) = post(&app, "/api/turn/text", serde_json::json!({ "text": "Hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["statuses"][1]["message"], "Chat service error: HTTP 500");
    assert!(json.get("audio").is_none());
    assert!(json.get("response").is_none());
}

#[tokio::test]
async fn test_record_turn_timeout() {
    let server = MockChatServer::start(&[]).await;
    let capture = ScriptedCapture::new(vec![Err(Error::CaptureTimeout(10))]);
    let app = build_test_router(&server, capture);
    onboard(&app, "Ada").await;

    let (status, json) = post(&app, "/api/turn/record", serde_json::json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["statuses"][0]["kind"], "listening");
    assert_eq!(json["statuses"][0]["timeout_secs"], 10);
    assert_eq!(
        json["statuses"][1]["message"],
        "Timeout: No speech detected within 10 seconds."
    );
    assert!(json.get("audio").is_none());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_record_turn_answers_speech() {
    let server = MockChatServer::start(&[(200, "Sure.")]).await;
    let app = build_test_router(&server, ScriptedCapture::saying("Can you help?"));
    onboard(&app, "Ada").await;

    let (status, json) = post(&app, "/api/turn/record", serde_json::json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Sure.");
    assert_eq!(server.requests()[0].body["messages"][1]["content"], "Can you help?");
}
