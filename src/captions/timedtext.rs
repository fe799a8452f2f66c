//! Timed-text parser
//!
//! Turns a caption document into an ordered list of [`CaptionInterval`]s.
//! Two dialects are understood:
//!
//! ```text
//! <transcript><text start="9.72" dur="2.68">Lately, I&amp;#39;ve been</text></transcript>
//! <timedtext format="3"><body><p t="9720" d="2680">Lately</p></body></timedtext>
//! ```
//!
//! The first carries seconds, the second milliseconds.

use super::CaptionInterval;
use crate::error::{CaptionError, Result};

/// Markup entities, in the order they are replaced. `&amp;` goes first so
/// that `&amp;quot;` ends up as `"`.
const ENTITIES: [(&str, &str); 5] = [
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&#39;", "'"),
];

/// Timed-text dialect, decides attribute names and time unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// `<text start dur>` in seconds
    Text,
    /// `<p t d>` in milliseconds
    Paragraph,
}

impl Dialect {
    fn start_attr(self) -> &'static str {
        match self {
            Dialect::Text => "start",
            Dialect::Paragraph => "t",
        }
    }

    fn duration_attr(self) -> &'static str {
        match self {
            Dialect::Text => "dur",
            Dialect::Paragraph => "d",
        }
    }

    fn to_secs(self, value: f64) -> f64 {
        match self {
            Dialect::Text => value,
            Dialect::Paragraph => value / 1000.0,
        }
    }
}

/// A cue as it appears in the document, before normalization
#[derive(Debug)]
struct RawEntry<'a> {
    attributes: &'a str,
    content: Option<&'a str>,
}

/// Parse a timed-text document.
///
/// Returns [`CaptionError::NoCaptions`] when the document holds no cue
/// elements at all. Cues whose text is blank are dropped; cues with a
/// non-numeric start are skipped.
pub fn parse_timed_text(document: &str) -> Result<Vec<CaptionInterval>> {
    let (dialect, entries) = find_entries(document).ok_or(CaptionError::NoCaptions)?;

    let mut intervals = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for entry in &entries {
        let Some(start) = numeric_attribute(entry.attributes, dialect.start_attr()) else {
            tracing::warn!(
                "Skipping caption entry with invalid start: {}",
                entry.attributes.trim()
            );
            dropped += 1;
            continue;
        };
        let duration = numeric_attribute(entry.attributes, dialect.duration_attr()).unwrap_or(0.0);

        let raw = entry.content.unwrap_or("");
        let raw = match dialect {
            Dialect::Paragraph => strip_tags(raw),
            Dialect::Text => raw.to_string(),
        };

        let Some(text) = normalize_text(&raw) else {
            dropped += 1;
            continue;
        };

        let start = dialect.to_secs(start);
        let end = start + dialect.to_secs(duration);
        intervals.push(CaptionInterval::new(start, end, &text));
    }

    if intervals
        .windows(2)
        .any(|pair| pair[1].start_secs < pair[0].start_secs)
    {
        tracing::warn!("Caption entries are not ordered by start time; lookups may miss cues");
    }

    tracing::debug!(
        "Parsed {} caption intervals ({} entries dropped)",
        intervals.len(),
        dropped
    );

    Ok(intervals)
}

/// Normalize cue text: unescape `\n` and `\"`, trim, then unescape entities.
/// Returns `None` when nothing is left after trimming.
pub fn normalize_text(raw: &str) -> Option<String> {
    let unescaped = raw.replace("\\n", "\n").replace("\\\"", "\"");
    let trimmed = unescaped.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(unescape_entities(trimmed))
}

/// Replace the five standard markup entities
pub fn unescape_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}

fn find_entries(document: &str) -> Option<(Dialect, Vec<RawEntry<'_>>)> {
    let text_entries = collect(regex!(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)"), document);
    if !text_entries.is_empty() {
        return Some((Dialect::Text, text_entries));
    }

    let paragraph_entries = collect(regex!(r"(?s)<p\b([^>]*?)(?:/>|>(.*?)</p>)"), document);
    if !paragraph_entries.is_empty() {
        return Some((Dialect::Paragraph, paragraph_entries));
    }

    None
}

fn collect<'a>(re: &regex::Regex, document: &'a str) -> Vec<RawEntry<'a>> {
    re.captures_iter(document)
        .map(|caps| RawEntry {
            attributes: caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            content: caps.get(2).map(|m| m.as_str()),
        })
        .collect()
}

fn numeric_attribute(attributes: &str, name: &str) -> Option<f64> {
    regex!(r#"([A-Za-z_:][-\w:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .and_then(|value| value.as_str().trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn strip_tags(raw: &str) -> String {
    regex!(r"<[^>]*>").replace_all(raw, "").into_owned()
}
