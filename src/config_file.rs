//! Configuration file support
//!
//! Loads engine configuration from TOML files. Every section is optional;
//! whatever is left out keeps its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{EngineConfig, SamplerConfig, SpeechConfig, SpeechPolicy};
use crate::platform::VoiceDescriptor;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Clock sampler settings
    pub sampler: Option<SamplerSettings>,
    /// Speech settings
    pub speech: Option<SpeechSectionSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// File locations and naming
    pub files: Option<FileSettings>,
    /// Voices offered by the simulated platform
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub voices: Vec<VoiceSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    /// Polling interval in milliseconds (250..=500)
    pub poll_interval_ms: Option<u64>,
    /// Lookahead added to the playback position, in seconds
    pub lookahead_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSectionSettings {
    /// "queue_with_pause" or "drop_while_busy"
    pub policy: Option<SpeechPolicy>,
    /// Platform compensates cloud voice speed itself
    pub native_rate_compensation: Option<bool>,
    /// Longest wait for an utterance to end, in milliseconds
    pub max_wait_ms: Option<u64>,
    /// Simulated engine speaking speed at rate 1.0
    pub words_per_second: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    /// JSON file for the persisted speech settings
    pub settings_path: Option<String>,
    /// Site suffix stripped from page titles
    pub title_suffix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub voice_uri: String,
    pub language_tag: String,
    /// Defaults to a local voice
    pub local_service: Option<bool>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let sampler = SamplerConfig::default();
        let speech = SpeechConfig::default();
        Self {
            sampler: Some(SamplerSettings {
                poll_interval_ms: Some(sampler.poll_interval_ms),
                lookahead_secs: Some(sampler.lookahead_secs),
            }),
            speech: Some(SpeechSectionSettings {
                policy: Some(speech.policy),
                native_rate_compensation: Some(speech.native_rate_compensation),
                max_wait_ms: Some(speech.max_wait_ms),
                words_per_second: Some(speech.words_per_second),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
            files: Some(FileSettings {
                settings_path: Some("speech-settings.json".to_string()),
                title_suffix: Some(" - YouTube".to_string()),
            }),
            voices: vec![
                VoiceSettings {
                    voice_uri: "Samantha".to_string(),
                    language_tag: "en-US".to_string(),
                    local_service: Some(true),
                },
                VoiceSettings {
                    voice_uri: "Google polski".to_string(),
                    language_tag: "pl-PL".to_string(),
                    local_service: Some(false),
                },
            ],
        }
    }

    /// Convert to EngineConfig
    pub fn into_engine_config(self) -> EngineConfig {
        let defaults = EngineConfig::default();

        let sampler = match self.sampler {
            Some(s) => SamplerConfig {
                poll_interval_ms: s.poll_interval_ms.unwrap_or(defaults.sampler.poll_interval_ms),
                lookahead_secs: s.lookahead_secs.unwrap_or(defaults.sampler.lookahead_secs),
            },
            None => defaults.sampler,
        };

        let speech = match self.speech {
            Some(s) => SpeechConfig {
                policy: s.policy.unwrap_or(defaults.speech.policy),
                native_rate_compensation: s
                    .native_rate_compensation
                    .unwrap_or(defaults.speech.native_rate_compensation),
                max_wait_ms: s.max_wait_ms.unwrap_or(defaults.speech.max_wait_ms),
                words_per_second: s.words_per_second.unwrap_or(defaults.speech.words_per_second),
            },
            None => defaults.speech,
        };

        let (settings_path, title_suffix) = match self.files {
            Some(f) => (f.settings_path, f.title_suffix.unwrap_or(defaults.title_suffix)),
            None => (defaults.settings_path, defaults.title_suffix),
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        EngineConfig {
            title_suffix,
            settings_path,
            log_level,
            log_format,
            sampler,
            speech,
            voices: self
                .voices
                .into_iter()
                .map(|v| VoiceDescriptor {
                    voice_uri: v.voice_uri,
                    language_tag: v.language_tag,
                    is_local_service: v.local_service.unwrap_or(true),
                })
                .collect(),
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
