//! HTTP server for the single-page voice chat UI

pub mod health;
pub mod turn;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::pipeline::TurnPipeline;
use crate::session::Session;
use crate::voice::{AudioLifecycle, WebAudioSlot};

/// The page served at `/`
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Everything one browser session mutates during a turn
pub struct Conversation {
    pub session: Session,
    pub audio: AudioLifecycle<WebAudioSlot>,
}

impl Conversation {
    #[must_use]
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            session: Session::new(),
            audio: AudioLifecycle::new(WebAudioSlot::new(), settle_delay),
        }
    }
}

/// Shared state for API handlers
pub struct ApiState {
    pub pipeline: TurnPipeline,
    /// Held for the whole turn so requests queue instead of interleaving
    pub conversation: Mutex<Conversation>,
}

impl ApiState {
    #[must_use]
    pub fn new(pipeline: TurnPipeline, settle_delay: Duration) -> Self {
        Self {
            pipeline,
            conversation: Mutex::new(Conversation::new(settle_delay)),
        }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/api", turn::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Web UI server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the server until it fails
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind web server: {e}")))?;

        tracing::info!(port = self.port, "web UI listening on http://localhost:{}", self.port);

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("web server error: {e}")))?;

        Ok(())
    }
}
