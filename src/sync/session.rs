//! Track sessions
//!
//! A session is one selected caption track being spoken against the video.
//! The [`SessionManager`] holds at most one at a time: starting a new one
//! tears the previous one down first, so there is never more than one
//! sampler polling the video.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::coordinator::{SpeechCoordinator, TickOutcome};
use super::sampler::{ClockSampler, ScheduledTask};
use super::voice::primary_language_subtag;
use crate::captions::cache::IntervalCache;
use crate::captions::tracks::{load_intervals, query_param, CaptionSource, CaptionTrack};
use crate::captions::IntervalStore;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::platform::{PlaybackElement, SpeechEngine, VoiceCatalog};
use crate::settings::{SettingsHandle, VoicePreference};

/// Everything a session talks to
#[derive(Clone)]
pub struct SessionDeps {
    pub player: Arc<dyn PlaybackElement>,
    pub engine: Arc<dyn SpeechEngine>,
    pub voices: Arc<dyn VoiceCatalog>,
    pub settings: SettingsHandle,
}

/// A running track session. Owns its polling task; dropping the session
/// cancels it.
pub struct ActiveTrackSession {
    id: Uuid,
    task: ScheduledTask,
    engine: Arc<dyn SpeechEngine>,
    cancelled: bool,
}

impl ActiveTrackSession {
    pub fn start(intervals: IntervalStore, deps: SessionDeps, config: &EngineConfig) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %id);
        let engine = deps.engine.clone();
        let count = intervals.len();

        let mut sampler = ClockSampler::new(deps.player.clone(), &config.sampler);
        let mut coordinator = SpeechCoordinator::new(intervals, deps, config.speech.clone());

        let task = ScheduledTask::spawn(
            async move {
                tracing::info!("Session started with {} caption intervals", count);
                loop {
                    let time = sampler.next_sample().await;
                    match coordinator.on_sample(time).await {
                        TickOutcome::NoCaption | TickOutcome::Unchanged => {}
                        outcome => tracing::debug!("{:?} at {:.2}s", outcome, time),
                    }
                }
            }
            .instrument(span),
        );

        Self {
            id,
            task,
            engine,
            cancelled: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled && self.task.is_active()
    }

    /// Stop polling and silence whatever is still being spoken. Safe to call
    /// more than once.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.task.cancel();
        self.engine.cancel();
        tracing::info!("Session {} stopped", self.id);
    }
}

impl Drop for ActiveTrackSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns the single active session of a page
pub struct SessionManager<S> {
    source: S,
    deps: SessionDeps,
    config: EngineConfig,
    cache: IntervalCache,
    active: Option<ActiveTrackSession>,
    current_track: Option<CaptionTrack>,
}

impl<S: CaptionSource> SessionManager<S> {
    pub fn new(source: S, deps: SessionDeps, config: EngineConfig) -> Self {
        Self {
            source,
            deps,
            config,
            cache: IntervalCache::new(),
            active: None,
            current_track: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.deps.settings
    }

    pub fn cache(&self) -> &IntervalCache {
        &self.cache
    }

    /// Load a track and start speaking it.
    ///
    /// Without an explicit `target` the remembered translation language is
    /// used. The language being spoken is remembered for voice resolution.
    /// When no captions can be loaded the current session keeps running.
    pub async fn select_track(
        &mut self,
        track: &CaptionTrack,
        target: Option<&str>,
    ) -> Result<Uuid> {
        let target = target
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .or_else(|| self.deps.settings.snapshot().remembered_auto_translate_language);

        let intervals = load_intervals(&self.source, track, target.as_deref(), &self.cache).await?;

        let spoken_language = target.unwrap_or_else(|| {
            query_param(&track.base_url, "lang").unwrap_or_else(|| track.language_code.clone())
        });
        self.deps
            .settings
            .update(|s| s.remembered_auto_translate_language = Some(spoken_language));

        tracing::info!("Selected caption track {}", track.label());
        self.current_track = Some(track.clone());
        Ok(self.start(intervals))
    }

    /// Switch to a voice picked by the user.
    ///
    /// The voice's language becomes the remembered translation language and
    /// the current track, if any, is reloaded translated into it. A local
    /// voice the platform no longer lists only changes the stored voice.
    pub async fn choose_voice(&mut self, voice: VoicePreference) -> Result<Option<Uuid>> {
        let language = match &voice {
            VoicePreference::RemoteTranslation(code) => Some(code.clone()),
            VoicePreference::Local(uri) => self
                .deps
                .voices
                .voices()
                .into_iter()
                .find(|v| &v.voice_uri == uri)
                .map(|v| primary_language_subtag(&v.language_tag)),
        };

        self.deps.settings.update(|s| {
            s.speech_voice = Some(voice);
            if let Some(code) = &language {
                s.remembered_auto_translate_language = Some(code.clone());
            }
        });

        let (Some(track), Some(code)) = (self.current_track.clone(), language) else {
            return Ok(None);
        };
        self.stop();
        tracing::info!("Voice changed, reloading {} as {}", track.label(), code);
        self.select_track(&track, Some(&code)).await.map(Some)
    }

    /// Start a session over already loaded intervals, replacing any running one
    pub fn start(&mut self, intervals: IntervalStore) -> Uuid {
        self.stop();
        let session = ActiveTrackSession::start(intervals, self.deps.clone(), &self.config);
        let id = session.id();
        self.active = Some(session);
        id
    }

    pub fn stop(&mut self) {
        if let Some(mut session) = self.active.take() {
            session.cancel();
        }
    }

    /// The page moved to another video: stop and forget cached tracks
    pub fn navigate(&mut self) {
        self.stop();
        self.current_track = None;
        self.cache.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|session| session.is_active())
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|session| session.id())
    }
}
