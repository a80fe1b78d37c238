//! Parley - a voice front end for remote chat models
//!
//! This library provides the pieces of a spoken conversation turn:
//! - Speech capture (microphone, voice activity detection, Whisper STT)
//! - Chat completions with bounded retry on service unavailability
//! - Speech synthesis and a single-slot playback lifecycle
//! - Session onboarding and the web UI server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        Web UI (axum)       │    Terminal (talk)      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  TurnPipeline                        │
//! │   Session  │  Capture  │  Chat  │  Synthesis        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 AudioLifecycle                       │
//! │     one active artifact │ temp file cleanup          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod status;
pub mod voice;

pub use chat::{ChatClient, ChatModel, ChatTurn};
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Onboarding, Reply, TurnPipeline};
pub use session::{Session, SessionPhase};
pub use status::{StatusSink, TurnStatus};
