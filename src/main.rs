//! Caption Speaker
//!
//! Reads video captions aloud in step with playback. Caption tracks are
//! parsed into timed intervals, a sampler polls the playback clock, and a
//! coordinator speaks each new caption, pausing the video when speech falls
//! behind. Tracks can also be exported as SubRip files.

#![allow(dead_code)]

// Compile a regex once and keep it around.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

mod captions;
mod config;
mod config_file;
mod error;
#[cfg(test)]
mod integration;
mod platform;
mod settings;
mod sync;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::captions::srt::build_subtitle_file;
use crate::captions::tracks::{extract_caption_tracks, CaptionTrack, FileCaptionSource};
use crate::config::EngineConfig;
use crate::error::{CaptionError, Result};
use crate::platform::simulated::{SimulatedPlayer, SimulatedSpeechEngine, VoiceList};
use crate::platform::PlaybackElement;
use crate::settings::{spawn_persistence, SettingsHandle, SettingsStore};
use crate::sync::{SessionDeps, SessionManager};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "caption-speaker";

/// Environment variable naming the config file
const CONFIG_ENV: &str = "CAPTION_SPEAKER_CONFIG";

const USAGE: &str = "usage:
  caption-speaker srt <timedtext.xml> <page title> <lang>
  caption-speaker tracks <watch.html>
  caption-speaker speak <timedtext.xml> <lang> [seconds]
  caption-speaker init-config [path]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let (config, config_warning) = load_config();
    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(warning) = config_warning {
        tracing::warn!("{}", warning);
    }
    config.validate()?;

    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["srt", path, title, lang] => write_srt(&config, path, title, lang).await,
        ["tracks", path] => list_tracks(path).await,
        ["speak", path, lang] => speak(&config, path, lang, None).await,
        ["speak", path, lang, seconds] => {
            let seconds = seconds
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or_else(|| CaptionError::Config(format!("invalid duration: {}", seconds)))?;
            speak(&config, path, lang, Some(seconds)).await
        }
        ["init-config"] => init_config("config.toml"),
        ["init-config", path] => init_config(path),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    match result {
        Err(CaptionError::NoCaptions) => {
            tracing::warn!("No captions available");
            Ok(())
        }
        other => other,
    }
}

/// Config from `$CAPTION_SPEAKER_CONFIG`, else `config.toml` when present,
/// else defaults. Load problems are returned for logging once logging is up.
fn load_config() -> (EngineConfig, Option<String>) {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
    if !std::path::Path::new(&config_path).exists() {
        return (EngineConfig::default(), None);
    }
    match crate::config_file::ConfigFile::from_file(&config_path) {
        Ok(cf) => (cf.into_engine_config(), None),
        Err(e) => (
            EngineConfig::default(),
            Some(format!(
                "Failed to load config file {}: {}. Using defaults.",
                config_path, e
            )),
        ),
    }
}

/// Initialize logging with tracing
fn init_logging(config: &EngineConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("caption_speaker={}", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn write_srt(config: &EngineConfig, path: &str, title: &str, lang: &str) -> Result<()> {
    let track = CaptionTrack::new(path, lang);
    let file = build_subtitle_file(&FileCaptionSource, &track, title, &config.title_suffix).await?;
    tokio::fs::write(&file.file_name, &file.contents).await?;
    tracing::info!("Wrote {}", file.file_name);
    Ok(())
}

async fn list_tracks(path: &str) -> Result<()> {
    let page = tokio::fs::read_to_string(path).await?;
    for track in extract_caption_tracks(&page)? {
        let kind = if track.is_auto_generated() {
            " (auto-generated)"
        } else {
            ""
        };
        println!("{}\t{}{}\t{}", track.language_code, track.label(), kind, track.base_url);
    }
    Ok(())
}

/// Play a caption file against the simulated player and speech engine
async fn speak(config: &EngineConfig, path: &str, lang: &str, seconds: Option<f64>) -> Result<()> {
    let settings = match &config.settings_path {
        Some(settings_path) => {
            let store = SettingsStore::new(settings_path);
            let handle = SettingsHandle::new(store.load_or_default()?);
            spawn_persistence(&handle, store);
            handle
        }
        None => SettingsHandle::default(),
    };

    let player = Arc::new(SimulatedPlayer::playing());
    let deps = SessionDeps {
        player: player.clone(),
        engine: Arc::new(SimulatedSpeechEngine::new(config.speech.words_per_second)),
        voices: Arc::new(VoiceList::new(config.voices.clone())),
        settings,
    };

    let mut manager = SessionManager::new(FileCaptionSource, deps, config.clone());
    let track = CaptionTrack::new(path, lang);
    let session = manager.select_track(&track, Some(lang)).await?;
    tracing::info!("Session {} playing {}", session, path);

    match seconds {
        Some(seconds) => tokio::time::sleep(Duration::from_secs_f64(seconds)).await,
        None => tokio::signal::ctrl_c().await?,
    }

    manager.stop();
    tracing::info!("Stopped at {:.2}s of playback", player.current_time());
    // Let the persistence task see the last settings change
    tokio::task::yield_now().await;
    Ok(())
}

fn init_config(path: &str) -> Result<()> {
    crate::config_file::generate_default_config(path)
        .map_err(|e| CaptionError::Config(e.to_string()))?;
    println!("Wrote default configuration to {}", path);
    Ok(())
}
