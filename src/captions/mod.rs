//! Caption tracks
//!
//! This module handles everything between a caption track and its intervals:
//! - Locating caption tracks in a watch page
//! - Building fetch URLs (translation target, ASR marker fallback)
//! - Parsing timed-text documents into caption intervals
//! - Transcoding intervals to SubRip (SRT)
//! - Caching parsed intervals per URL

pub mod cache;
pub mod srt;
pub mod timedtext;
pub mod tracks;

use std::sync::Arc;

/// One subtitle cue. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionInterval {
    /// Start time in seconds
    pub start_secs: f64,
    /// End time in seconds, never before the start
    pub end_secs: f64,
    /// Normalized cue text, never empty
    pub text: String,
}

impl CaptionInterval {
    pub fn new(start_secs: f64, end_secs: f64, text: &str) -> Self {
        Self {
            start_secs,
            end_secs: end_secs.max(start_secs),
            text: text.to_string(),
        }
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// All intervals of one caption track, in source order
pub type IntervalStore = Arc<[CaptionInterval]>;
