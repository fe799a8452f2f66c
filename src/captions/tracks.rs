//! Caption track catalog and fetching
//!
//! Tracks are listed in the watch page as a JSON array under
//! `"captionTracks"`. Each track's `baseUrl` serves its timed-text document;
//! appending `tlang=<code>` asks for a machine translation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use super::cache::IntervalCache;
use super::timedtext::parse_timed_text;
use super::IntervalStore;
use crate::error::{CaptionError, Result};

/// Marker the site appends to auto-generated (speech recognition) tracks
pub const ASR_MARKER: &str = "&kind=asr";

/// Display name of a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackName {
    #[serde(default)]
    pub simple_text: Option<String>,
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    pub name: TrackName,
    /// `Some("asr")` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn new(base_url: &str, language_code: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            language_code: language_code.to_string(),
            name: TrackName::default(),
            kind: None,
        }
    }

    /// Human readable label, falling back to the language code
    pub fn label(&self) -> &str {
        self.name
            .simple_text
            .as_deref()
            .unwrap_or(&self.language_code)
    }

    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Something that can fetch a caption document. `None` (or an empty body)
/// means the fetch produced nothing usable.
pub trait CaptionSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Reads caption documents from disk; the query part of the URL is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCaptionSource;

impl CaptionSource for FileCaptionSource {
    async fn fetch(&self, url: &str) -> Option<String> {
        let path = url.split('?').next().unwrap_or(url);
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!("Failed to read caption file {}: {}", path, e);
                None
            }
        }
    }
}

/// Extract the caption track list embedded in a watch page
pub fn extract_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let caps = regex!(r#"\{"captionTracks":(\[.*?\]),"#)
        .captures(page)
        .ok_or(CaptionError::NoCaptions)?;

    let tracks: Vec<CaptionTrack> =
        serde_json::from_str(&caps[1]).map_err(|e| CaptionError::TrackList(e.to_string()))?;

    if tracks.is_empty() {
        return Err(CaptionError::NoCaptions);
    }
    Ok(tracks)
}

/// Value of a query parameter, percent-decoded
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            urlencoding::decode(&value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| value.clone())
        })
}

/// URL to fetch for speech, optionally translated to `target`.
///
/// A target equal to the track's own language needs no translation.
pub fn speech_url(track: &CaptionTrack, target: Option<&str>) -> String {
    let base = &track.base_url;
    match target {
        Some(code) if query_param(base, "lang").as_deref() == Some(code) => base.clone(),
        Some(code) if !code.is_empty() => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{}{}tlang={}", base, separator, urlencoding::encode(code))
        }
        _ => base.clone(),
    }
}

/// Drop the auto-generated marker from a URL
pub fn without_asr_marker(url: &str) -> String {
    url.replace(ASR_MARKER, "")
}

/// Fetch and parse the intervals used for speech.
///
/// The URL without the ASR marker is tried first; when that yields nothing
/// the marked URL is tried. Parsed results are cached per URL.
pub async fn load_intervals<S: CaptionSource>(
    source: &S,
    track: &CaptionTrack,
    target: Option<&str>,
    cache: &IntervalCache,
) -> Result<IntervalStore> {
    let marked = speech_url(track, target);
    let unmarked = without_asr_marker(&marked);

    let mut candidates = vec![unmarked];
    if candidates[0] != marked {
        candidates.push(marked);
    }

    for url in candidates {
        if let Some(store) = cache.get(&url) {
            tracing::debug!("Using cached intervals for {}", url);
            return Ok(store);
        }

        let Some(document) = source.fetch(&url).await.filter(|doc| !doc.trim().is_empty())
        else {
            tracing::debug!("Empty caption response from {}", url);
            continue;
        };

        match parse_timed_text(&document) {
            Ok(intervals) => {
                let store: IntervalStore = intervals.into();
                cache.insert(&url, store.clone());
                return Ok(store);
            }
            Err(e) => tracing::debug!("Unusable caption document from {}: {}", url, e),
        }
    }

    Err(CaptionError::NoCaptions)
}
