//! Platform collaborators
//!
//! The engine never talks to a browser directly. It drives three seams:
//! - the playback element (current position, play, pause)
//! - the speech engine (local utterances and the remote translation voice)
//! - the voice catalog, which may still be empty while the platform enumerates

pub mod simulated;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A synthesis voice as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Stable identifier of the voice
    pub voice_uri: String,
    /// BCP 47 tag, e.g. `en-US`
    pub language_tag: String,
    /// False for cloud-backed voices
    pub is_local_service: bool,
}

impl VoiceDescriptor {
    pub fn new(voice_uri: &str, language_tag: &str, is_local_service: bool) -> Self {
        Self {
            voice_uri: voice_uri.to_string(),
            language_tag: language_tag.to_string(),
            is_local_service,
        }
    }
}

/// The video element being synchronized against
pub trait PlaybackElement: Send + Sync {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;
    fn play(&self);
    fn pause(&self);
}

/// Source of the voices currently available for local synthesis
pub trait VoiceCatalog: Send + Sync {
    fn voices(&self) -> Vec<VoiceDescriptor>;
}

/// A local synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` lets the platform pick its default voice
    pub voice: Option<VoiceDescriptor>,
    pub rate: f64,
    pub volume: f64,
}

/// A request for the remote translation voice channel
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSpeechRequest {
    pub text: String,
    pub language_code: String,
    pub rate: f64,
    pub volume: f64,
}

/// Speech synthesis backend
pub trait SpeechEngine: Send + Sync {
    /// Start speaking locally. The returned completion resolves at end of utterance.
    fn speak(&self, utterance: Utterance) -> SpeechCompletion;

    /// Deliver the text through the remote translation voice
    fn speak_remote(&self, request: RemoteSpeechRequest) -> SpeechCompletion;

    /// Stop everything still being spoken
    fn cancel(&self);
}

/// Create the two halves of an end-of-utterance notification
pub fn completion_pair() -> (SpeechCompleter, SpeechCompletion) {
    let (tx, rx) = oneshot::channel();
    (
        SpeechCompleter { tx },
        SpeechCompletion { rx, done: false },
    )
}

/// Engine side of an utterance. Dropping it without calling `finish` also
/// counts as the end of the utterance.
#[derive(Debug)]
pub struct SpeechCompleter {
    tx: oneshot::Sender<()>,
}

impl SpeechCompleter {
    pub fn finish(self) {
        // Receiver gone means nobody waits for this utterance anymore.
        let _ = self.tx.send(());
    }
}

/// Coordinator side of an utterance; resolves once the engine is done with it
#[derive(Debug)]
pub struct SpeechCompletion {
    rx: oneshot::Receiver<()>,
    done: bool,
}

impl SpeechCompletion {
    /// Non-blocking check whether the utterance has ended
    pub fn is_finished(&mut self) -> bool {
        if !self.done {
            self.done = !matches!(
                self.rx.try_recv(),
                Err(oneshot::error::TryRecvError::Empty)
            );
        }
        self.done
    }
}

impl Future for SpeechCompletion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(_) => {
                self.done = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
