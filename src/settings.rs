//! Speech settings
//!
//! One shared `SpeechSettings` record, last writer wins. Every writer goes
//! through [`SettingsHandle::update`], which applies the change as a single
//! read-modify-write and notifies subscribers. Persistence is just another
//! subscriber.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{CaptionError, Result};

/// Which voice the user (or the last resolution) settled on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicePreference {
    /// A platform voice, by voice URI
    Local(String),
    /// The remote translation voice for a language code
    RemoteTranslation(String),
}

/// User speech preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Nominal speech rate
    pub speech_speed: f64,
    /// Volume in 0.0..=1.0
    pub speech_volume: f64,
    /// Preferred voice; `None` means platform default
    pub speech_voice: Option<VoicePreference>,
    /// Last language picked for auto translation
    pub remembered_auto_translate_language: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            speech_speed: 2.3,
            speech_volume: 1.0,
            speech_voice: None,
            remembered_auto_translate_language: None,
        }
    }
}

/// Shared access to the live settings record
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<SpeechSettings>>,
}

impl SettingsHandle {
    pub fn new(initial: SpeechSettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> SpeechSettings {
        self.tx.borrow().clone()
    }

    /// Apply a change atomically. Subscribers are only notified when the
    /// record actually changed. Returns whether it did.
    pub fn update<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut SpeechSettings),
    {
        self.tx.send_if_modified(|settings| {
            let before = settings.clone();
            change(settings);
            *settings != before
        })
    }

    /// Register for change notifications
    pub fn subscribe(&self) -> watch::Receiver<SpeechSettings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(SpeechSettings::default())
    }
}

/// JSON file holding the persisted settings
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored settings, or defaults when nothing has been stored yet
    pub fn load_or_default(&self) -> Result<SpeechSettings> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                CaptionError::Settings(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SpeechSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &SpeechSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Save the settings every time they change, until the handle is gone
pub fn spawn_persistence(handle: &SettingsHandle, store: SettingsStore) -> JoinHandle<()> {
    let mut rx = handle.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let settings = rx.borrow_and_update().clone();
            match store.save(&settings) {
                Ok(()) => tracing::debug!("Saved speech settings to {}", store.path().display()),
                Err(e) => tracing::warn!("Failed to save speech settings: {}", e),
            }
        }
    })
}
