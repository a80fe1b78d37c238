use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley::api::{ApiServer, ApiState};
use parley::status::{StatusSink, TurnStatus};
use parley::voice::{SpeechSynthesizer, TextToSpeech};
use parley::{Config, TurnPipeline};

/// Parley - talk to a chat model with your voice
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web UI (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Converse from the terminal using the microphone and speakers
    Talk,
    /// Speak a sentence with the configured TTS provider
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
        /// Write the MP3 here instead of playing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&config, port).await,
        Command::Talk => talk::run(&config).await,
        Command::Say { text, output } => say(&config, &text, output.as_deref()).await,
    }
}

/// Run the web UI server
async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let pipeline = TurnPipeline::from_config(config)?;
    let state = Arc::new(ApiState::new(pipeline, config.voice.settle_delay));
    let port = port.unwrap_or(config.server.port);

    tracing::info!(
        port,
        model = %config.chat.model,
        tts = ?config.voice.tts_provider,
        "starting parley"
    );

    ApiServer::new(state, port).run().await?;
    Ok(())
}

/// Synthesize one sentence and play or save it
async fn say(config: &Config, text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let tts = TextToSpeech::from_config(&config.voice)?;

    println!("Synthesizing speech...");
    let mp3 = tts.synthesize(text, &config.voice.language).await?;
    println!("Got {} bytes of audio data", mp3.len());

    if let Some(path) = output {
        tokio::fs::write(path, &mp3).await?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    talk::play_once(config, &mp3).await
}

/// Prints statuses to the terminal as they arrive
#[cfg_attr(not(feature = "audio-io"), allow(dead_code))]
struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn emit(&self, status: TurnStatus) {
        match status {
            TurnStatus::Response { text } => println!("\n  {text}\n"),
            TurnStatus::Error { message } => eprintln!("! {message}"),
            other => println!("{other}"),
        }
    }
}

#[cfg(feature = "audio-io")]
mod talk {
    use std::time::Duration;

    use dialoguer::Input;
    use parley::voice::{AudioArtifact, AudioLifecycle, SpeakerSurface};
    use parley::{Config, Error, Session, TurnPipeline};

    use super::ConsoleStatus;

    /// Longest a reply may play before the next prompt appears
    const PLAYBACK_LIMIT: Duration = Duration::from_secs(60);

    /// Interactive terminal conversation
    pub async fn run(config: &Config) -> anyhow::Result<()> {
        let pipeline = TurnPipeline::from_config(config)?;
        let mut session = Session::new();
        let mut audio = AudioLifecycle::new(SpeakerSurface::new(), config.voice.settle_delay);
        let status = ConsoleStatus;

        println!("Speech Chat Bot");
        let onboarding = loop {
            let name = prompt("Please enter your name to begin").await?;
            match pipeline.run_onboarding_turn(&mut session, &name, &status).await {
                Ok(onboarding) => break onboarding,
                Err(e @ Error::InvalidName) => eprintln!("! {}", e.status_message()),
                Err(e) => return Err(e.into()),
            }
        };

        if let Some(artifact) = onboarding.artifact {
            speak(&mut audio, artifact).await;
        }

        loop {
            let line = prompt("Press Enter to speak, type a question, or 'quit'").await?;
            let reply = match line.trim() {
                "quit" | "exit" => break,
                "" => pipeline.run_recorded_turn(&session, &status).await,
                text => pipeline.run_query_turn(text, &session, &status).await,
            };

            if let Some(reply) = reply {
                speak(&mut audio, reply.artifact).await;
            }
        }

        audio.stop();
        Ok(())
    }

    /// Play raw MP3 bytes and wait for them to finish
    pub async fn play_once(config: &Config, mp3: &[u8]) -> anyhow::Result<()> {
        let mut audio = AudioLifecycle::new(SpeakerSurface::new(), config.voice.settle_delay);
        let playback = audio.play(AudioArtifact::from_mp3(mp3)?).await?;
        println!("Playing audio...");
        playback.finished_within(PLAYBACK_LIMIT).await;
        println!("Done!");
        Ok(())
    }

    async fn speak(audio: &mut AudioLifecycle<SpeakerSurface>, artifact: AudioArtifact) {
        match audio.play(artifact).await {
            Ok(playback) => {
                // Keep the microphone closed until the reply has been heard
                if !playback.finished_within(PLAYBACK_LIMIT).await {
                    tracing::warn!("playback did not finish in time");
                    audio.stop();
                }
            }
            Err(e) => eprintln!("! {}", e.status_message()),
        }
    }

    async fn prompt(text: &'static str) -> anyhow::Result<String> {
        let line = tokio::task::spawn_blocking(move || -> dialoguer::Result<String> {
            let line: String = Input::new()
                .with_prompt(text)
                .allow_empty(true)
                .interact_text()?;
            Ok(line)
        })
        .await??;
        Ok(line)
    }
}

#[cfg(not(feature = "audio-io"))]
mod talk {
    use parley::Config;

    #[allow(clippy::unused_async)]
    pub async fn run(_config: &Config) -> anyhow::Result<()> {
        anyhow::bail!("terminal mode needs speakers; rebuild with the audio-io feature")
    }

    #[allow(clippy::unused_async)]
    pub async fn play_once(_config: &Config, _mp3: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("playback needs the audio-io feature; pass --output to save the audio")
    }
}
