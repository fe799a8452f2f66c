//! End-to-end integration tests
//!
//! Every scenario drives a real [`SessionManager`] against the simulated
//! player and speech engine. Run them on paused tokio time so clock ticks and
//! utterance lengths are exact.

use std::sync::Arc;
use std::time::Duration;

use crate::captions::srt::build_subtitle_file;
use crate::captions::timedtext::parse_timed_text;
use crate::captions::tracks::CaptionTrack;
use crate::captions::IntervalStore;
use crate::config::{EngineConfig, SpeechPolicy};
use crate::error::CaptionError;
use crate::integration::fixtures::{
    english_track, StaticCaptionSource, TestCaptionDoc, ASR_TRACK_URL, TRACK_URL,
};
use crate::platform::simulated::{
    SimulatedPlayer, SimulatedSpeechEngine, SpeechChannel, VoiceList,
};
use crate::platform::VoiceDescriptor;
use crate::settings::{spawn_persistence, SettingsHandle, SettingsStore, VoicePreference};
use crate::sync::{SessionDeps, SessionManager};

/// Outcome of a scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ScenarioResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn check(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.is_valid = false;
            self.errors.push(message.into());
        }
    }
}

/// Simulated page: one video, one speech engine, one settings record
pub struct TestPlatform {
    pub player: Arc<SimulatedPlayer>,
    pub engine: Arc<SimulatedSpeechEngine>,
    pub voices: Arc<VoiceList>,
    pub settings: SettingsHandle,
}

impl TestPlatform {
    pub fn new(engine: SimulatedSpeechEngine) -> Self {
        Self {
            player: Arc::new(SimulatedPlayer::playing()),
            engine: Arc::new(engine),
            voices: Arc::new(VoiceList::new(vec![
                VoiceDescriptor::new("Samantha", "en-US", true),
                VoiceDescriptor::new("Google polski", "pl-PL", false),
            ])),
            settings: SettingsHandle::default(),
        }
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            player: self.player.clone(),
            engine: self.engine.clone(),
            voices: self.voices.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn manager(
        &self,
        source: StaticCaptionSource,
        config: EngineConfig,
    ) -> SessionManager<StaticCaptionSource> {
        SessionManager::new(source, self.deps(), config)
    }
}

fn intervals(doc: &TestCaptionDoc) -> IntervalStore {
    parse_timed_text(doc.document).unwrap_or_default().into()
}

/// A track spoken from start to end with short utterances: every caption
/// once, in order, without touching the video
pub async fn scenario_plain_session() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let source = StaticCaptionSource::new().with(TRACK_URL, TestCaptionDoc::english().document);
    let mut manager = platform.manager(source, EngineConfig::default());

    if let Err(e) = manager.select_track(&english_track(), None).await {
        result.check(false, format!("select_track failed: {}", e));
        return result;
    }
    tokio::time::sleep(Duration::from_millis(12_500)).await;
    manager.stop();

    let expected = vec![
        "Hello and welcome",
        "Today we talk about \"Rust\"",
        "It's fast",
        "and safe",
        "Thanks for watching",
    ];
    result.check(
        platform.engine.spoken_texts() == expected,
        format!("unexpected utterances: {:?}", platform.engine.spoken_texts()),
    );
    result.check(platform.player.pause_count() == 0, "video was paused");
    result.check(
        platform
            .engine
            .spoken()
            .iter()
            .all(|u| u.channel == SpeechChannel::Local(Some("Samantha".to_string()))),
        "expected the English local voice",
    );
    result.check(
        platform.settings.snapshot().remembered_auto_translate_language.as_deref() == Some("en"),
        "track language not remembered",
    );
    result.check(!manager.is_active(), "session still active after stop");
    result
}

/// Captions longer than their slot: the video waits for speech
pub async fn scenario_queue_with_pause() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    platform
        .settings
        .update(|s| s.speech_voice = Some(VoicePreference::Local("Samantha".to_string())));
    let mut manager = platform.manager(StaticCaptionSource::new(), EngineConfig::default());

    manager.start(intervals(&TestCaptionDoc::wordy()));
    tokio::time::sleep(Duration::from_secs(8)).await;
    manager.stop();

    let spoken = platform.engine.spoken_texts();
    result.check(
        spoken.len() == 3 && spoken[2] == "short",
        format!("unexpected utterances: {:?}", spoken),
    );
    result.check(platform.player.pause_count() >= 1, "video never paused");
    result.check(
        platform.player.pause_count() == platform.player.play_count(),
        "every pause must be followed by a resume",
    );
    result.check(!platform.player.is_paused(), "video left paused");
    result.check(
        platform.engine.max_concurrent() == 1,
        format!("overlapping speech: {}", platform.engine.max_concurrent()),
    );
    result
}

/// Legacy policy: captions arriving during speech are dropped, the video is
/// never paused
pub async fn scenario_drop_while_busy() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    platform
        .settings
        .update(|s| s.speech_voice = Some(VoicePreference::Local("Samantha".to_string())));
    let mut config = EngineConfig::default();
    config.speech.policy = SpeechPolicy::DropWhileBusy;
    let mut manager = platform.manager(StaticCaptionSource::new(), config);

    manager.start(intervals(&TestCaptionDoc::wordy()));
    tokio::time::sleep(Duration::from_secs(5)).await;
    manager.stop();

    let spoken = platform.engine.spoken_texts();
    result.check(platform.player.pause_count() == 0, "video was paused");
    result.check(
        spoken.len() == 2 && spoken[1] == "short",
        format!("unexpected utterances: {:?}", spoken),
    );
    result
}

/// Restarting a session leaves exactly one sampler running
pub async fn scenario_single_session() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let mut manager = platform.manager(StaticCaptionSource::new(), EngineConfig::default());

    let first = manager.start(intervals(&TestCaptionDoc::english()));
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let second = manager.start(intervals(&TestCaptionDoc::english()));
    platform.player.reset_clock_reads();
    platform.engine.reset_stats();
    tokio::time::sleep(Duration::from_millis(4900)).await;

    result.check(first != second, "session ids must differ");
    result.check(manager.active_id() == Some(second), "wrong active session");
    // One sampler at 500ms over 4.9s
    result.check(
        platform.player.clock_reads() == 10,
        format!("expected 10 clock reads, got {}", platform.player.clock_reads()),
    );
    result.check(
        platform.engine.max_concurrent() <= 1,
        format!("overlapping speech: {}", platform.engine.max_concurrent()),
    );

    manager.stop();
    platform.player.reset_clock_reads();
    tokio::time::sleep(Duration::from_secs(2)).await;
    result.check(platform.player.clock_reads() == 0, "sampler survived stop");
    result
}

/// Auto-generated track translated to English: the URL without the ASR
/// marker is tried first, then the marked one; the result is cached until
/// navigation
pub async fn scenario_asr_fallback_and_cache() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let marked = format!("{}&tlang=en", ASR_TRACK_URL);
    let unmarked = marked.replace("&kind=asr", "");
    let source = StaticCaptionSource::new().with(&marked, TestCaptionDoc::english().document);
    let mut manager = platform.manager(source, EngineConfig::default());
    let track = CaptionTrack::new(ASR_TRACK_URL, "pl");

    if let Err(e) = manager.select_track(&track, Some("en")).await {
        result.check(false, format!("select_track failed: {}", e));
        return result;
    }
    let requests = manager_requests(&manager);
    result.check(
        requests == vec![unmarked.clone(), marked.clone()],
        format!("unexpected requests: {:?}", requests),
    );

    tokio::time::sleep(Duration::from_millis(600)).await;
    result.check(
        platform.engine.spoken_texts().first().map(String::as_str) == Some("Hello and welcome"),
        "first caption not spoken",
    );

    // Reselecting uses the cached intervals
    let _ = manager.select_track(&track, Some("en")).await;
    let marked_fetches = manager_requests(&manager)
        .iter()
        .filter(|url| **url == marked)
        .count();
    result.check(marked_fetches == 1, "cached track fetched again");
    result.check(manager.cache().len() == 1, "expected one cached track");

    manager.navigate();
    result.check(manager.cache().is_empty(), "cache survived navigation");
    result.check(!manager.is_active(), "session survived navigation");
    result
}

fn manager_requests(manager: &SessionManager<StaticCaptionSource>) -> Vec<String> {
    manager.source().requests()
}

/// Translation into a language without a local voice goes to the remote
/// channel, and that choice is persisted
pub async fn scenario_remote_translation_voice() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let dir = match tempfile::TempDir::new() {
        Ok(dir) => dir,
        Err(e) => {
            result.check(false, format!("tempdir: {}", e));
            return result;
        }
    };
    let store = SettingsStore::new(dir.path().join("speech.json"));
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let persistence = spawn_persistence(&platform.settings, store.clone());

    let url = format!("{}&tlang=ja", TRACK_URL);
    let source = StaticCaptionSource::new().with(&url, TestCaptionDoc::polish().document);
    let mut manager = platform.manager(source, EngineConfig::default());

    if let Err(e) = manager.select_track(&english_track(), Some("ja")).await {
        result.check(false, format!("select_track failed: {}", e));
        return result;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.stop();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let spoken = platform.engine.spoken();
    result.check(!spoken.is_empty(), "nothing spoken");
    if let Some(first) = spoken.first() {
        result.check(
            first.channel == SpeechChannel::Remote("ja".to_string()),
            format!("expected remote channel, got {:?}", first.channel),
        );
        result.check((first.rate - 1.2).abs() < 1e-9, "remote rate not rescaled");
        result.check(first.text == "Witam serdecznie", "unexpected text");
    }

    match store.load_or_default() {
        Ok(saved) => {
            result.check(
                saved.speech_voice == Some(VoicePreference::RemoteTranslation("ja".to_string())),
                format!("persisted voice: {:?}", saved.speech_voice),
            );
            result.check(
                saved.remembered_auto_translate_language.as_deref() == Some("ja"),
                "translation language not persisted",
            );
        }
        Err(e) => result.check(false, format!("settings not saved: {}", e)),
    }
    persistence.abort();
    result
}

/// Picking a voice switches the translation language to the voice's and
/// reloads the playing track in it
pub async fn scenario_voice_change_reloads_track() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let translated = format!("{}&tlang=pl", TRACK_URL);
    let source = StaticCaptionSource::new()
        .with(TRACK_URL, TestCaptionDoc::english().document)
        .with(&translated, TestCaptionDoc::polish().document);
    let mut manager = platform.manager(source, EngineConfig::default());

    let first = match manager.select_track(&english_track(), None).await {
        Ok(id) => id,
        Err(e) => {
            result.check(false, format!("select_track failed: {}", e));
            return result;
        }
    };
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let voice = VoicePreference::Local("Google polski".to_string());
    let second = match manager.choose_voice(voice.clone()).await {
        Ok(id) => id,
        Err(e) => {
            result.check(false, format!("choose_voice failed: {}", e));
            return result;
        }
    };
    result.check(
        second.is_some() && second != Some(first),
        format!("expected a new session, got {:?}", second),
    );
    result.check(
        manager_requests(&manager).contains(&translated),
        "translated track not requested",
    );

    let settings = platform.settings.snapshot();
    result.check(settings.speech_voice == Some(voice), "chosen voice not stored");
    result.check(
        settings.remembered_auto_translate_language.as_deref() == Some("pl"),
        format!(
            "remembered language: {:?}",
            settings.remembered_auto_translate_language
        ),
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    manager.stop();

    let polish = ["Witam serdecznie", "Dzisiaj o Rust", "Jest szybki"];
    let spoken = platform.engine.spoken();
    result.check(
        spoken.iter().any(|u| {
            polish.contains(&u.text.as_str())
                && u.channel == SpeechChannel::Local(Some("Google polski".to_string()))
        }),
        format!("no Polish speech after the voice change: {:?}", spoken),
    );
    result.check(
        spoken
            .first()
            .is_some_and(|u| u.channel == SpeechChannel::Local(Some("Samantha".to_string()))),
        "English captions should start on the English voice",
    );
    result.check(
        platform.settings.snapshot().speech_voice
            == Some(VoicePreference::Local("Google polski".to_string())),
        "chosen voice overwritten",
    );
    result
}

/// Stopping while the video is paused for speech resumes it and silences
/// the engine
pub async fn scenario_teardown_resumes_video() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::with_fixed_duration(
        Duration::from_secs(60),
    ));
    let mut manager = platform.manager(StaticCaptionSource::new(), EngineConfig::default());

    manager.start(intervals(&TestCaptionDoc::wordy()));
    tokio::time::sleep(Duration::from_millis(1200)).await;
    result.check(platform.player.is_paused(), "video should wait for speech");

    manager.stop();
    tokio::time::sleep(Duration::from_millis(10)).await;
    result.check(!platform.player.is_paused(), "video left paused after stop");
    result.check(platform.engine.active_count() == 0, "speech still running");
    result
}

/// A track without captions is reported, and the running session is kept
pub async fn scenario_no_captions() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let platform = TestPlatform::new(SimulatedSpeechEngine::new(2.5));
    let mut manager = platform.manager(StaticCaptionSource::new(), EngineConfig::default());

    let running = manager.start(intervals(&TestCaptionDoc::english()));
    let outcome = manager.select_track(&english_track(), None).await;
    result.check(
        matches!(outcome, Err(CaptionError::NoCaptions)),
        format!("expected NoCaptions, got {:?}", outcome),
    );
    result.check(manager.active_id() == Some(running), "running session replaced");
    manager.stop();
    result
}

/// Subtitle export of a track
pub async fn scenario_srt_export() -> ScenarioResult {
    let mut result = ScenarioResult::success();
    let source = StaticCaptionSource::new().with(TRACK_URL, TestCaptionDoc::english().document);

    match build_subtitle_file(&source, &english_track(), "Learning Rust - YouTube", " - YouTube")
        .await
    {
        Ok(file) => {
            result.check(
                file.file_name == "Learning Rust.en.srt",
                format!("file name: {}", file.file_name),
            );
            result.check(
                file.contents
                    .starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello and welcome.\n\n"),
                "first block malformed",
            );
            result.check(
                file.contents.contains("\n\n6\n00:00:12,000 --> 00:00:14,000\nBye\n\n"),
                "blank cue must not take a number",
            );
            result.check(!file.contents.contains("\n7\n"), "too many blocks");
        }
        Err(e) => result.check(false, format!("export failed: {}", e)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(name: &str, result: ScenarioResult) {
        assert!(result.is_valid, "{} failed: {:?}", name, result.errors);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_session_e2e() {
        assert_valid("plain session", scenario_plain_session().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_with_pause_e2e() {
        assert_valid("queue with pause", scenario_queue_with_pause().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_while_busy_e2e() {
        assert_valid("drop while busy", scenario_drop_while_busy().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_session_e2e() {
        assert_valid("single session", scenario_single_session().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_asr_fallback_and_cache_e2e() {
        assert_valid("asr fallback", scenario_asr_fallback_and_cache().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_translation_voice_e2e() {
        assert_valid("remote voice", scenario_remote_translation_voice().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_change_reloads_track_e2e() {
        assert_valid("voice change", scenario_voice_change_reloads_track().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_resumes_video_e2e() {
        assert_valid("teardown", scenario_teardown_resumes_video().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_captions_e2e() {
        assert_valid("no captions", scenario_no_captions().await);
    }

    #[tokio::test]
    async fn test_srt_export_e2e() {
        assert_valid("srt export", scenario_srt_export().await);
    }
}
