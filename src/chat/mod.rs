//! Chat completions client
//!
//! Sends one user utterance plus a persona system prompt to an
//! `OpenAI`-compatible `/chat/completions` endpoint and returns the reply text.

mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub use retry::{Backoff, RetryPolicy, TokioBackoff, is_retryable_status};

use crate::config::ChatConfig;
use crate::status::{StatusSink, TurnStatus};
use crate::{Error, Result};

/// Name the assistant introduces itself with
pub const ASSISTANT_NAME: &str = "Speech Chat Bot";

/// Build the system instruction for a user
#[must_use]
pub fn system_prompt(user_name: &str) -> String {
    format!(
        "You are {ASSISTANT_NAME}, an AI assistant. The user's name is {user_name}. \
         Provide concise, professional, and helpful answers, using the user's name where appropriate."
    )
}

/// One user utterance and the model's answer to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub input_text: String,
    pub system_prompt: String,
    pub reply: Option<String>,
}

impl ChatTurn {
    #[must_use]
    pub fn new(input_text: impl Into<String>, user_name: &str) -> Self {
        Self {
            input_text: input_text.into(),
            system_prompt: system_prompt(user_name),
            reply: None,
        }
    }
}

/// Anything that can answer a chat turn
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the reply text for a turn
    ///
    /// # Errors
    ///
    /// Returns error if no reply could be obtained
    async fn complete(&self, turn: &ChatTurn, status: &dyn StatusSink) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an `OpenAI`-compatible chat endpoint with bounded retry
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    temperature: f32,
    policy: RetryPolicy,
    backoff: Arc<dyn Backoff>,
}

impl ChatClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = config.api_key.as_ref().ok_or_else(|| {
            Error::Config(
                "chat API key required (set PARLEY_API_KEY or OPENROUTER_API_KEY)".to_string(),
            )
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: SecretString::from(api_key.expose_secret().to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            policy: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                delay: config.retry_delay,
            },
            backoff: Arc::new(TokioBackoff),
        })
    }

    /// Replace the backoff used between attempts
    #[must_use]
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Active retry policy
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a single utterance on behalf of `user_name`
    ///
    /// # Errors
    ///
    /// Returns error if every attempt failed or a non-retryable error occurred
    pub async fn send(
        &self,
        input_text: &str,
        user_name: &str,
        status: &dyn StatusSink,
    ) -> Result<String> {
        self.complete(&ChatTurn::new(input_text, user_name), status)
            .await
    }

    /// Run one HTTP attempt
    async fn attempt(&self, request: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                Error::ChatUnexpected(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ChatHttp {
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            Error::ChatUnexpected(e.to_string())
        })?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::ChatUnexpected("response contained no message".to_string()))
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, turn: &ChatTurn, status: &dyn StatusSink) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &turn.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &turn.input_text,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            tracing::debug!(attempt, max_attempts, model = %self.model, "sending chat request");

            match self.attempt(&request).await {
                Ok(reply) => {
                    tracing::info!(attempt, reply_len = reply.len(), "chat reply received");
                    return Ok(reply);
                }
                Err(e) if self.policy.should_retry(attempt, &e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "chat endpoint unavailable, retrying"
                    );
                    status.emit(TurnStatus::Retrying {
                        attempt,
                        max_attempts,
                    });
                    self.backoff.wait(self.policy.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "chat request gave up");
                    return Err(e);
                }
            }
        }
    }
}
