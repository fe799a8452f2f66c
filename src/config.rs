//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, Result};
use crate::platform::VoiceDescriptor;

/// Polling band accepted for the clock sampler, in milliseconds
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const MAX_POLL_INTERVAL_MS: u64 = 500;

/// Clock sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Time between two reads of the playback clock
    pub poll_interval_ms: u64,

    /// Added to the playback position so speech onset lines up with the caption
    pub lookahead_secs: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            lookahead_secs: 0.25,
        }
    }
}

impl SamplerConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// What the coordinator does when a new caption arrives while still speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeechPolicy {
    /// Pause the video, wait for the utterance to end, resume, then speak
    #[default]
    QueueWithPause,
    /// Legacy behaviour: skip the new caption
    DropWhileBusy,
}

/// Speech coordination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Busy policy
    pub policy: SpeechPolicy,

    /// The platform already compensates cloud voice speed (no rate rescaling)
    pub native_rate_compensation: bool,

    /// Upper bound on waiting for an utterance to finish while the video is paused
    pub max_wait_ms: u64,

    /// Speaking speed of the simulated engine at rate 1.0
    pub words_per_second: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            policy: SpeechPolicy::QueueWithPause,
            native_rate_compensation: false,
            max_wait_ms: 30_000,
            words_per_second: 2.5,
        }
    }
}

impl SpeechConfig {
    pub fn max_wait(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_wait_ms)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Site suffix stripped from page titles when naming subtitle files
    pub title_suffix: String,

    /// JSON file holding the persisted speech settings
    pub settings_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Clock sampler configuration
    pub sampler: SamplerConfig,

    /// Speech coordination configuration
    pub speech: SpeechConfig,

    /// Voices offered by the simulated platform
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voices: Vec<VoiceDescriptor>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title_suffix: " - YouTube".to_string(),
            settings_path: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            sampler: SamplerConfig::default(),
            speech: SpeechConfig::default(),
            voices: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let poll = self.sampler.poll_interval_ms;
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&poll) {
            return Err(CaptionError::Config(format!(
                "poll_interval_ms must be within {}..={}, got {}",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, poll
            )));
        }
        if !self.sampler.lookahead_secs.is_finite() || self.sampler.lookahead_secs < 0.0 {
            return Err(CaptionError::Config(format!(
                "lookahead_secs must be a non-negative number, got {}",
                self.sampler.lookahead_secs
            )));
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(CaptionError::Config(format!(
                "log_format must be \"pretty\" or \"json\", got {:?}",
                self.log_format
            )));
        }
        if self.speech.max_wait_ms == 0 {
            return Err(CaptionError::Config("max_wait_ms must be positive".to_string()));
        }
        if !(self.speech.words_per_second > 0.0) {
            return Err(CaptionError::Config(format!(
                "words_per_second must be positive, got {}",
                self.speech.words_per_second
            )));
        }
        Ok(())
    }
}
