//! In-process stand-ins for the platform
//!
//! Used by the `speak` command and by tests. All clocks run on
//! `tokio::time::Instant` so paused-time tests stay deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{
    completion_pair, PlaybackElement, RemoteSpeechRequest, SpeechCompletion, SpeechEngine,
    Utterance, VoiceCatalog, VoiceDescriptor,
};

#[derive(Debug)]
struct PlayerState {
    /// Position when playback last started or stopped
    position: f64,
    /// Set while playing
    resumed_at: Option<Instant>,
    pause_count: usize,
    play_count: usize,
    clock_reads: usize,
}

impl PlayerState {
    fn position(&self) -> f64 {
        match self.resumed_at {
            Some(at) => self.position + at.elapsed().as_secs_f64(),
            None => self.position,
        }
    }
}

/// A video element whose clock advances with (virtual) wall time while playing
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
}

impl SimulatedPlayer {
    /// A player already playing from position zero
    pub fn playing() -> Self {
        Self {
            state: Mutex::new(PlayerState {
                position: 0.0,
                resumed_at: Some(Instant::now()),
                pause_count: 0,
                play_count: 0,
                clock_reads: 0,
            }),
        }
    }

    /// Jump to a position, keeping the play/pause state
    pub fn seek(&self, position: f64) {
        let mut state = self.state.lock();
        state.position = position;
        if state.resumed_at.is_some() {
            state.resumed_at = Some(Instant::now());
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().resumed_at.is_none()
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().pause_count
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    /// Number of `current_time` reads since creation or the last reset
    pub fn clock_reads(&self) -> usize {
        self.state.lock().clock_reads
    }

    pub fn reset_clock_reads(&self) {
        self.state.lock().clock_reads = 0;
    }
}

impl PlaybackElement for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        let mut state = self.state.lock();
        state.clock_reads += 1;
        state.position()
    }

    fn play(&self) {
        let mut state = self.state.lock();
        state.play_count += 1;
        if state.resumed_at.is_none() {
            state.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.pause_count += 1;
        if state.resumed_at.is_some() {
            state.position = state.position();
            state.resumed_at = None;
        }
    }
}

/// Delivery path of a recorded utterance
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechChannel {
    /// Local synthesis; `None` is the platform default voice
    Local(Option<String>),
    /// Remote translation voice for a language code
    Remote(String),
}

/// An utterance the simulated engine has started
#[derive(Debug, Clone, PartialEq)]
pub struct SpokenUtterance {
    pub text: String,
    pub channel: SpeechChannel,
    pub rate: f64,
    pub volume: f64,
    /// Offset from engine creation
    pub started_at: Duration,
}

#[derive(Debug, Default)]
struct EngineState {
    spoken: Vec<SpokenUtterance>,
    active: HashMap<u64, JoinHandle<()>>,
    next_id: u64,
    max_concurrent: usize,
}

/// Speech engine that "speaks" by sleeping for a duration derived from the
/// word count and rate, then signalling completion
#[derive(Debug)]
pub struct SimulatedSpeechEngine {
    state: Arc<Mutex<EngineState>>,
    words_per_second: f64,
    fixed_duration: Option<Duration>,
    epoch: Instant,
}

impl SimulatedSpeechEngine {
    pub fn new(words_per_second: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            words_per_second,
            fixed_duration: None,
            epoch: Instant::now(),
        }
    }

    /// Every utterance lasts exactly `duration`, regardless of text and rate
    pub fn with_fixed_duration(duration: Duration) -> Self {
        Self {
            fixed_duration: Some(duration),
            ..Self::new(2.5)
        }
    }

    /// How long an utterance of `text` at `rate` takes
    pub fn duration_for(&self, text: &str, rate: f64) -> Duration {
        if let Some(fixed) = self.fixed_duration {
            return fixed;
        }
        let words = text.split_whitespace().count().max(1) as f64;
        Duration::from_secs_f64(words / (self.words_per_second * rate.max(0.1)))
    }

    pub fn spoken(&self) -> Vec<SpokenUtterance> {
        self.state.lock().spoken.clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.state.lock().spoken.iter().map(|u| u.text.clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Highest number of overlapping utterances seen since creation or reset
    pub fn max_concurrent(&self) -> usize {
        self.state.lock().max_concurrent
    }

    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.max_concurrent = state.active.len();
    }

    fn start(
        &self,
        text: String,
        channel: SpeechChannel,
        rate: f64,
        volume: f64,
    ) -> SpeechCompletion {
        let duration = self.duration_for(&text, rate);
        let (completer, completion) = completion_pair();

        // Hold the lock across spawn so the task cannot remove its entry before it exists.
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        tracing::info!(
            "Speaking {:?} via {:?} (rate={}, volume={}, {:.2}s)",
            text,
            channel,
            rate,
            volume,
            duration.as_secs_f64()
        );
        state.spoken.push(SpokenUtterance {
            text,
            channel,
            rate,
            volume,
            started_at: self.epoch.elapsed(),
        });

        let shared = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            shared.lock().active.remove(&id);
            completer.finish();
        });
        state.active.insert(id, handle);
        state.max_concurrent = state.max_concurrent.max(state.active.len());

        completion
    }
}

impl SpeechEngine for SimulatedSpeechEngine {
    fn speak(&self, utterance: Utterance) -> SpeechCompletion {
        let channel = SpeechChannel::Local(utterance.voice.map(|v| v.voice_uri));
        self.start(utterance.text, channel, utterance.rate, utterance.volume)
    }

    fn speak_remote(&self, request: RemoteSpeechRequest) -> SpeechCompletion {
        let channel = SpeechChannel::Remote(request.language_code);
        self.start(request.text, channel, request.rate, request.volume)
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        let cancelled = state.active.len();
        for (_, handle) in state.active.drain() {
            handle.abort();
        }
        if cancelled > 0 {
            tracing::debug!("Cancelled {} utterance(s)", cancelled);
        }
    }
}

/// Voice catalog that can be filled in later, the way platforms report
/// their voices asynchronously
#[derive(Debug, Default)]
pub struct VoiceList {
    voices: RwLock<Vec<VoiceDescriptor>>,
}

impl VoiceList {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Self {
        Self {
            voices: RwLock::new(voices),
        }
    }

    pub fn replace(&self, voices: Vec<VoiceDescriptor>) {
        *self.voices.write() = voices;
    }
}

impl VoiceCatalog for VoiceList {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.read().clone()
    }
}
