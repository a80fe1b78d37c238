//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use parley::chat::Backoff;
use parley::config::ChatConfig;
use parley::voice::{CaptureLimits, SpeechCapture, SpeechSynthesizer};
use parley::{Error, Result};
use secrecy::SecretString;

/// Bearer token the mock endpoint expects
pub const TEST_API_KEY: &str = "test-api-key";

/// One request the mock chat endpoint received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub at: Instant,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Local chat completions endpoint answering from a script
///
/// Each request pops one `(status, text)` pair; 200 answers carry `text` as
/// the reply content, others carry it as the body. An empty script answers
/// 200 "ok".
pub struct MockChatServer {
    pub url: String,
    state: Arc<MockState>,
}

impl MockChatServer {
    pub async fn start(script: &[(u16, &str)]) -> Self {
        let state = Arc::new(MockState::default());
        state
            .script
            .lock()
            .unwrap()
            .extend(script.iter().map(|(code, text)| (*code, (*text).to_string())));

        let app = Router::new()
            .route("/v1/chat/completions", post(complete))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/v1/chat/completions"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Chat configuration pointing at this server
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            endpoint: self.url.clone(),
            api_key: Some(SecretString::from(TEST_API_KEY.to_string())),
            ..ChatConfig::default()
        }
    }
}

async fn complete(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        at: Instant::now(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let (code, text) = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, "ok".to_string()));

    let status = StatusCode::from_u16(code).unwrap();
    if status.is_success() {
        (
            status,
            Json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": text } }]
            })),
        )
            .into_response()
    } else {
        (status, text).into_response()
    }
}

/// Records requested delays without sleeping
#[derive(Default)]
pub struct RecordingBackoff {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Capture that replays scripted outcomes
pub struct ScriptedCapture {
    outcomes: Mutex<VecDeque<Result<String>>>,
    pub calls: Mutex<Vec<CaptureLimits>>,
}

impl ScriptedCapture {
    pub fn new(outcomes: Vec<Result<String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn saying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    async fn listen(&self, limits: &CaptureLimits) -> Result<String> {
        self.calls.lock().unwrap().push(*limits);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Error::CaptureTimeout(limits.start_timeout.as_secs())))
    }
}

/// Synthesizer returning a fake MP3 wrapping the text
#[derive(Default)]
pub struct FakeSynthesizer {
    pub spoken: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn audio_for(text: &str) -> Vec<u8> {
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        audio
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(Self::audio_for(text))
    }
}
