//! SubRip (SRT) transcoder

use std::fmt::Write;

use super::timedtext::parse_timed_text;
use super::tracks::{CaptionSource, CaptionTrack};
use super::CaptionInterval;
use crate::error::{CaptionError, Result};

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// Milliseconds are truncated, never rounded. Negative and non-finite input
/// formats as zero.
pub fn format_srt_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let millis = (seconds * 1000.0).floor() as u64 % 1000;
    let whole = seconds.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Convert intervals to SRT, numbering cues 1..N in order
pub fn intervals_to_srt(intervals: &[CaptionInterval]) -> String {
    let mut output = String::new();
    for (i, interval) in intervals.iter().enumerate() {
        // Writing into a String cannot fail
        let _ = write!(
            output,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(interval.start_secs),
            format_srt_time(interval.end_secs),
            interval.text
        );
    }
    output
}

/// Parse a timed-text document and transcode it to SRT
pub fn timed_text_to_srt(document: &str) -> Result<String> {
    let intervals = parse_timed_text(document)?;
    Ok(intervals_to_srt(&intervals))
}

/// File name for a downloaded track: `<title without site suffix>.<lang>.srt`
pub fn subtitle_file_name(page_title: &str, language_code: &str, site_suffix: &str) -> String {
    let mut title = page_title.trim_end();
    let suffix = site_suffix.trim();
    if !suffix.is_empty() && title.len() >= suffix.len() {
        let split = title.len() - suffix.len();
        if title.is_char_boundary(split) && title[split..].eq_ignore_ascii_case(suffix) {
            title = title[..split].trim_end();
        }
    }

    let title: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.{}.srt", title, language_code)
}

/// A subtitle file ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleFile {
    pub file_name: String,
    pub contents: String,
}

/// Fetch a track's original (untranslated) captions and transcode them
pub async fn build_subtitle_file<S: CaptionSource>(
    source: &S,
    track: &CaptionTrack,
    page_title: &str,
    site_suffix: &str,
) -> Result<SubtitleFile> {
    let document = source
        .fetch(&track.base_url)
        .await
        .filter(|doc| !doc.trim().is_empty())
        .ok_or(CaptionError::NoCaptions)?;

    let contents = timed_text_to_srt(&document)?;
    tracing::info!(
        "Built subtitle file for track {} ({} bytes)",
        track.language_code,
        contents.len()
    );

    Ok(SubtitleFile {
        file_name: subtitle_file_name(page_title, &track.language_code, site_suffix),
        contents,
    })
}
