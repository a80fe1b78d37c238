//! Session and turn endpoints driving the pipeline

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiState, Conversation};
use crate::pipeline::Reply;
use crate::session::SessionPhase;
use crate::status::{StatusLog, StatusSink, TurnStatus};
use crate::voice::{AudioArtifact, InlineAudio};
use crate::{Error, Session};

/// Build session and turn router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/session", get(session))
        .route("/session/name", post(submit_name))
        .route("/turn/record", post(record_turn))
        .route("/turn/text", post(text_turn))
        .with_state(state)
}

/// Session state as the page sees it
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            phase: session.phase(),
            user_name: session.user_name().map(str::to_string),
        }
    }
}

/// Outcome of a name submission or turn
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session: SessionView,
    /// Statuses in emission order
    pub statuses: Vec<TurnStatus>,
    /// Text for the response region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Audio to autoplay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<InlineAudio>,
}

impl TurnResponse {
    fn collect(conversation: &Conversation, status: &StatusLog, presented: bool) -> Self {
        Self {
            session: SessionView::from(&conversation.session),
            response: status.last_response(),
            statuses: status.take(),
            audio: if presented {
                conversation.audio.surface().current()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

async fn session(State(state): State<Arc<ApiState>>) -> Json<SessionView> {
    let conversation = state.conversation.lock().await;
    Json(SessionView::from(&conversation.session))
}

async fn submit_name(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<NameRequest>,
) -> (StatusCode, Json<TurnResponse>) {
    let mut conversation = state.conversation.lock().await;
    let status = StatusLog::new();

    if conversation.session.is_onboarded() {
        tracing::debug!("name submitted after onboarding");
        return (
            StatusCode::CONFLICT,
            Json(TurnResponse::collect(&conversation, &status, false)),
        );
    }

    let onboarding = match state
        .pipeline
        .run_onboarding_turn(&mut conversation.session, &request.name, &status)
        .await
    {
        Ok(onboarding) => onboarding,
        Err(e @ Error::InvalidName) => {
            status.emit(TurnStatus::error(e.status_message()));
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(TurnResponse::collect(&conversation, &status, false)),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "onboarding failed");
            status.emit(TurnStatus::error(e.status_message()));
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TurnResponse::collect(&conversation, &status, false)),
            );
        }
    };

    let presented = match onboarding.artifact {
        Some(artifact) => present(&mut conversation, artifact, &status).await,
        None => false,
    };

    (
        StatusCode::OK,
        Json(TurnResponse::collect(&conversation, &status, presented)),
    )
}

async fn text_turn(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TextRequest>,
) -> (StatusCode, Json<TurnResponse>) {
    let mut conversation = state.conversation.lock().await;
    let status = StatusLog::new();

    if !conversation.session.accepts_queries() {
        return not_onboarded(&conversation, &status);
    }

    let reply = state
        .pipeline
        .run_query_turn(&request.text, &conversation.session, &status)
        .await;

    finish_turn(&mut conversation, reply, &status).await
}

async fn record_turn(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<TurnResponse>) {
    let mut conversation = state.conversation.lock().await;
    let status = StatusLog::new();

    if !conversation.session.accepts_queries() {
        return not_onboarded(&conversation, &status);
    }

    let reply = state
        .pipeline
        .run_recorded_turn(&conversation.session, &status)
        .await;

    finish_turn(&mut conversation, reply, &status).await
}

fn not_onboarded(conversation: &Conversation, status: &StatusLog) -> (StatusCode, Json<TurnResponse>) {
    tracing::debug!("turn requested before onboarding");
    (
        StatusCode::CONFLICT,
        Json(TurnResponse::collect(conversation, status, false)),
    )
}

async fn finish_turn(
    conversation: &mut Conversation,
    reply: Option<Reply>,
    status: &StatusLog,
) -> (StatusCode, Json<TurnResponse>) {
    let presented = match reply {
        Some(reply) => present(conversation, reply.artifact, status).await,
        None => false,
    };

    (
        StatusCode::OK,
        Json(TurnResponse::collect(conversation, status, presented)),
    )
}

/// Hand an artifact to the page's audio slot
async fn present(conversation: &mut Conversation, artifact: AudioArtifact, status: &StatusLog) -> bool {
    match conversation.audio.play(artifact).await {
        Ok(playback) => {
            tracing::debug!(id = playback.id(), "reply audio queued for page");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "could not present audio");
            status.emit(TurnStatus::error(e.status_message()));
            false
        }
    }
}
