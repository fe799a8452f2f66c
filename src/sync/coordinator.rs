//! Speech coordinator
//!
//! Decides on every clock sample whether a new caption has to be spoken, and
//! keeps speech and video in step when an utterance runs longer than its
//! caption. This is the only place that pauses or resumes the video.

use std::sync::Arc;

use super::locator::locate;
use super::session::SessionDeps;
use super::voice::{resolve, VoiceSelection};
use crate::captions::IntervalStore;
use crate::config::{SpeechConfig, SpeechPolicy};
use crate::platform::{PlaybackElement, RemoteSpeechRequest, SpeechCompletion, Utterance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Speaking,
    /// Video paused, a new caption queued behind the current utterance
    WaitingForSpeechEnd,
}

/// What a single sample led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No caption covers the sampled time
    NoCaption,
    /// Same caption as last time
    Unchanged,
    /// New caption, nothing left to say after cleanup
    Skipped,
    Spoke,
    /// New caption spoken after pausing for the previous one
    SpokeAfterWait,
    /// New caption ignored because speech was in progress
    Dropped,
}

/// Pauses the video for as long as it lives. Resuming on drop also covers
/// the session being torn down in the middle of a wait.
struct PauseGuard {
    player: Arc<dyn PlaybackElement>,
}

impl PauseGuard {
    fn engage(player: Arc<dyn PlaybackElement>) -> Self {
        player.pause();
        Self { player }
    }
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.player.play();
    }
}

pub struct SpeechCoordinator {
    intervals: IntervalStore,
    deps: SessionDeps,
    config: SpeechConfig,
    state: CoordinatorState,
    last_spoken: Option<String>,
    in_flight: Option<SpeechCompletion>,
}

impl SpeechCoordinator {
    pub fn new(intervals: IntervalStore, deps: SessionDeps, config: SpeechConfig) -> Self {
        Self {
            intervals,
            deps,
            config,
            state: CoordinatorState::Idle,
            last_spoken: None,
            in_flight: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn last_spoken(&self) -> Option<&str> {
        self.last_spoken.as_deref()
    }

    /// Handle one clock sample
    pub async fn on_sample(&mut self, time: f64) -> TickOutcome {
        self.poll_completion();

        let text = match locate(&self.intervals, time) {
            None => return TickOutcome::NoCaption,
            Some(matched) if self.last_spoken.as_deref() == Some(matched.text.as_str()) => {
                return TickOutcome::Unchanged;
            }
            Some(matched) => matched.text.clone(),
        };

        let busy = self.state == CoordinatorState::Speaking;
        if busy && self.config.policy == SpeechPolicy::DropWhileBusy {
            tracing::debug!("Speech in progress, dropping caption at {:.2}s", time);
            return TickOutcome::Dropped;
        }

        self.last_spoken = Some(text.clone());
        let waited = busy;
        if busy {
            self.wait_for_speech_end().await;
        }

        if !self.speak(&text) {
            return TickOutcome::Skipped;
        }
        if waited {
            TickOutcome::SpokeAfterWait
        } else {
            TickOutcome::Spoke
        }
    }

    /// Clears the in-progress state once the engine reports the end of the
    /// current utterance
    fn poll_completion(&mut self) {
        if let Some(completion) = self.in_flight.as_mut() {
            if completion.is_finished() {
                self.in_flight = None;
                self.state = CoordinatorState::Idle;
            }
        }
    }

    async fn wait_for_speech_end(&mut self) {
        let Some(completion) = self.in_flight.take() else {
            self.state = CoordinatorState::Idle;
            return;
        };

        self.state = CoordinatorState::WaitingForSpeechEnd;
        tracing::info!("Speech is behind the captions, pausing playback");
        let paused = PauseGuard::engage(self.deps.player.clone());

        let max_wait = self.config.max_wait();
        if tokio::time::timeout(max_wait, completion).await.is_err() {
            tracing::warn!(
                "No end of speech after {}ms, cancelling it and resuming",
                max_wait.as_millis()
            );
            self.deps.engine.cancel();
        }

        drop(paused);
        self.state = CoordinatorState::Idle;
    }

    /// Start speaking `caption`. Returns false when cleanup leaves nothing to say.
    fn speak(&mut self, caption: &str) -> bool {
        let Some(text) = clean_for_speech(caption) else {
            tracing::debug!("Nothing to say for caption {:?}", caption);
            return false;
        };

        let settings = self.deps.settings.snapshot();
        let voices = self.deps.voices.voices();
        let resolved = resolve(
            &settings,
            settings.remembered_auto_translate_language.as_deref(),
            &voices,
            self.config.native_rate_compensation,
        );

        let completion = match &resolved.selection {
            VoiceSelection::RemoteTranslation(code) => {
                self.deps.engine.speak_remote(RemoteSpeechRequest {
                    text,
                    language_code: code.clone(),
                    rate: resolved.rate,
                    volume: resolved.volume,
                })
            }
            VoiceSelection::Local(voice) => self.deps.engine.speak(Utterance {
                text,
                voice: Some(voice.clone()),
                rate: resolved.rate,
                volume: resolved.volume,
            }),
            VoiceSelection::PlatformDefault => self.deps.engine.speak(Utterance {
                text,
                voice: None,
                rate: resolved.rate,
                volume: resolved.volume,
            }),
        };

        if resolved.persist {
            let preference = resolved.selection.preference();
            if self.deps.settings.update(|s| s.speech_voice = preference) {
                tracing::debug!("Remembered voice {:?}", resolved.selection);
            }
        }

        self.in_flight = Some(completion);
        self.state = CoordinatorState::Speaking;
        true
    }
}

/// Prepare caption text for synthesis: line breaks become spaces, escaped
/// quotes are unescaped, trailing commas and periods go.
pub fn clean_for_speech(caption: &str) -> Option<String> {
    let text = caption
        .replace("\\\"", "\"")
        .replace(['\n', '\r'], " ");
    let text = text.trim().trim_end_matches([',', '.']).trim_end();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
