//! Voice resolution policy
//!
//! Picks the voice, rate and volume for the next utterance from the user's
//! settings, the remembered translation language and whatever voices the
//! platform currently reports.

use crate::platform::VoiceDescriptor;
use crate::settings::{SpeechSettings, VoicePreference};

/// Configured rates are expected within this range...
const RATE_INPUT_RANGE: (f64, f64) = (1.7, 3.0);
/// ...and are mapped onto this one for cloud-backed voices
const RATE_OUTPUT_RANGE: (f64, f64) = (1.0, 1.4);

/// How the next utterance is delivered
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceSelection {
    /// A voice from the platform's list
    Local(VoiceDescriptor),
    /// The remote translation voice for a language code
    RemoteTranslation(String),
    /// Let the platform choose
    PlatformDefault,
}

impl VoiceSelection {
    /// The preference to remember after speaking with this selection
    pub fn preference(&self) -> Option<VoicePreference> {
        match self {
            VoiceSelection::Local(voice) => Some(VoicePreference::Local(voice.voice_uri.clone())),
            VoiceSelection::RemoteTranslation(code) => {
                Some(VoicePreference::RemoteTranslation(code.clone()))
            }
            VoiceSelection::PlatformDefault => None,
        }
    }
}

/// Outcome of voice resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVoice {
    pub selection: VoiceSelection,
    pub rate: f64,
    pub volume: f64,
    /// False when the platform had no voices yet and the selection only
    /// stands in until the list arrives
    pub persist: bool,
}

/// Primary language subtag, lowercased: `en-US` → `en`, `fil_PH` → `fil`
pub fn primary_language_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Whether two language tags share their primary subtag
pub fn same_language(a: &str, b: &str) -> bool {
    let a = primary_language_subtag(a);
    !a.is_empty() && a == primary_language_subtag(b)
}

/// Map a configured rate from [1.7, 3.0] onto [1.0, 1.4], rounded to one
/// decimal. Cloud voices speak faster than local engines at the same rate.
pub fn rescale_cloud_rate(rate: f64) -> f64 {
    let (in_min, in_max) = RATE_INPUT_RANGE;
    let (out_min, out_max) = RATE_OUTPUT_RANGE;
    let scaled = (rate - in_min) / (in_max - in_min) * (out_max - out_min) + out_min;
    ((scaled * 10.0).round() / 10.0).max(0.1)
}

/// Resolve the voice for the next utterance.
///
/// With a remembered translation language, a voice speaking that language
/// wins, and the remote translation voice covers the case where none exists
/// (or the user asked for it). Without one, the configured voice is used if
/// the platform still offers it, otherwise the platform default.
pub fn resolve(
    settings: &SpeechSettings,
    remembered_language: Option<&str>,
    voices: &[VoiceDescriptor],
    native_rate_compensation: bool,
) -> ResolvedVoice {
    let preferred_local = match &settings.speech_voice {
        Some(VoicePreference::Local(uri)) => voices.iter().find(|v| &v.voice_uri == uri),
        _ => None,
    };

    let selection = match remembered_language.filter(|code| !code.is_empty()) {
        Some(code) => {
            let language_match = voices.iter().find(|v| same_language(&v.language_tag, code));
            match (&settings.speech_voice, language_match) {
                (Some(VoicePreference::RemoteTranslation(remote)), Some(local))
                    if !same_language(remote, code) =>
                {
                    VoiceSelection::Local(local.clone())
                }
                (Some(VoicePreference::RemoteTranslation(_)), _) => {
                    VoiceSelection::RemoteTranslation(code.to_string())
                }
                (None, Some(local)) => VoiceSelection::Local(local.clone()),
                _ => match preferred_local {
                    Some(voice) if same_language(&voice.language_tag, code) => {
                        VoiceSelection::Local(voice.clone())
                    }
                    _ => match language_match {
                        Some(local) => VoiceSelection::Local(local.clone()),
                        None => VoiceSelection::RemoteTranslation(code.to_string()),
                    },
                },
            }
        }
        None => match &settings.speech_voice {
            Some(VoicePreference::RemoteTranslation(code)) => {
                VoiceSelection::RemoteTranslation(code.clone())
            }
            _ => preferred_local
                .cloned()
                .map(VoiceSelection::Local)
                .unwrap_or(VoiceSelection::PlatformDefault),
        },
    };

    let speed = settings.speech_speed;
    let rate = match &selection {
        VoiceSelection::RemoteTranslation(_) => rescale_cloud_rate(speed),
        VoiceSelection::Local(voice) if !voice.is_local_service && !native_rate_compensation => {
            rescale_cloud_rate(speed)
        }
        VoiceSelection::PlatformDefault if !native_rate_compensation => rescale_cloud_rate(speed),
        _ => speed,
    };

    ResolvedVoice {
        selection,
        rate,
        volume: settings.speech_volume,
        persist: !voices.is_empty(),
    }
}
