//! Configuration management for Parley
//!
//! Values are layered: built-in defaults, then the TOML file, then
//! environment variables. Secrets never have a compiled-in default.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::voice::CaptureLimits;
use crate::{Error, Result};
use file::ParleyConfigFile;

/// Default chat completions endpoint
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";

/// Default web UI port
pub const DEFAULT_PORT: u16 = 8501;

/// Parley configuration
#[derive(Debug)]
pub struct Config {
    /// Chat endpoint configuration
    pub chat: ChatConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Web UI server configuration
    pub server: ServerConfig,
}

/// Chat endpoint configuration
#[derive(Debug)]
pub struct ChatConfig {
    /// Chat completions URL
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Bearer token for the chat endpoint
    pub api_key: Option<SecretString>,

    /// Response length cap in tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
            max_tokens: 150,
            temperature: 0.7,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Which text-to-speech backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProviderKind {
    /// Google Translate speech endpoint (no key required)
    #[default]
    Google,
    /// `OpenAI` speech API
    OpenAI,
    /// `ElevenLabs` speech API
    ElevenLabs,
}

impl std::str::FromStr for TtsProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gtts" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// TTS backend
    pub tts_provider: TtsProviderKind,

    /// TTS model (`OpenAI` / `ElevenLabs` only)
    pub tts_model: String,

    /// TTS voice identifier (`OpenAI` voice name or `ElevenLabs` voice id)
    pub tts_voice: String,

    /// TTS speed multiplier (`OpenAI` only)
    pub tts_speed: f32,

    /// Spoken language code
    pub language: String,

    /// Whisper model used to transcribe microphone audio
    pub stt_model: String,

    /// `OpenAI` API key (Whisper and `OpenAI` TTS)
    pub openai_api_key: Option<SecretString>,

    /// `ElevenLabs` API key
    pub elevenlabs_api_key: Option<SecretString>,

    /// Microphone capture bounds
    pub capture: CaptureLimits,

    /// Upper bound on waiting for playback to start before deleting the file
    pub settle_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tts_provider: TtsProviderKind::default(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            language: "en".to_string(),
            stt_model: "whisper-1".to_string(),
            openai_api_key: None,
            elevenlabs_api_key: None,
            capture: CaptureLimits::default(),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Web UI server configuration
#[derive(Debug)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    /// Load configuration from the config file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be interpreted
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Environment values win over file values, which win over defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be interpreted
    pub fn from_sources(
        fc: ParleyConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = ChatConfig::default();
        let chat = ChatConfig {
            endpoint: env("PARLEY_CHAT_URL")
                .or(fc.chat.endpoint)
                .unwrap_or(defaults.endpoint),
            model: env("PARLEY_MODEL")
                .or(fc.chat.model)
                .unwrap_or(defaults.model),
            api_key: secret(env("PARLEY_API_KEY"))
                .or_else(|| secret(env("OPENROUTER_API_KEY")))
                .or_else(|| secret(fc.api_keys.chat)),
            max_tokens: fc.chat.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: fc.chat.temperature.unwrap_or(defaults.temperature),
            max_attempts: fc.chat.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            retry_delay: fc
                .chat
                .retry_delay_ms
                .map_or(defaults.retry_delay, Duration::from_millis),
        };

        let voice_defaults = VoiceConfig::default();
        let tts_provider = match env("PARLEY_TTS_PROVIDER").or(fc.voice.tts_provider) {
            Some(name) => name.parse()?,
            None => voice_defaults.tts_provider,
        };
        let capture_defaults = CaptureLimits::default();
        let voice = VoiceConfig {
            tts_provider,
            tts_model: env("PARLEY_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(voice_defaults.tts_model),
            tts_voice: env("PARLEY_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(voice_defaults.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(voice_defaults.tts_speed),
            language: env("PARLEY_LANGUAGE")
                .or(fc.voice.language)
                .unwrap_or(voice_defaults.language),
            stt_model: env("PARLEY_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(voice_defaults.stt_model),
            openai_api_key: secret(env("OPENAI_API_KEY"))
                .or_else(|| secret(fc.api_keys.openai)),
            elevenlabs_api_key: secret(env("ELEVENLABS_API_KEY"))
                .or_else(|| secret(fc.api_keys.elevenlabs)),
            capture: CaptureLimits {
                start_timeout: fc
                    .voice
                    .listen_timeout_secs
                    .map_or(capture_defaults.start_timeout, Duration::from_secs),
                phrase_limit: fc
                    .voice
                    .phrase_limit_secs
                    .map_or(capture_defaults.phrase_limit, Duration::from_secs),
                ..capture_defaults
            },
            settle_delay: fc
                .voice
                .settle_delay_ms
                .map_or(voice_defaults.settle_delay, Duration::from_millis),
        };

        let server = ServerConfig {
            port: env("PARLEY_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            chat,
            voice,
            server,
        })
    }
}

/// An empty value counts as unset so the next source is consulted
fn secret(value: Option<String>) -> Option<SecretString> {
    value.filter(|k| !k.is_empty()).map(SecretString::from)
}
