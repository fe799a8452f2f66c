//! Interval locator
//!
//! Maps a sampled playback time to the caption that should be active.

use crate::captions::CaptionInterval;

/// Find the caption whose span contains `time`.
///
/// The span of interval `i` runs from its own start to the start of interval
/// `i + 1`, so small gaps and overlaps between adjacent cues are absorbed.
/// The last interval has no successor and is never matched. Requires the
/// intervals to be sorted by start.
pub fn locate(intervals: &[CaptionInterval], time: f64) -> Option<&CaptionInterval> {
    if intervals.len() < 2 || !time.is_finite() {
        return None;
    }

    let mut low = 0usize;
    let mut high = intervals.len() - 1;

    while low < high {
        let mid = low + (high - low) / 2;
        let current = &intervals[mid];
        let next = &intervals[mid + 1];

        if time >= current.start_secs && time <= next.start_secs {
            return Some(current);
        } else if time < current.start_secs {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    None
}

/// Legacy linear scan: first interval with `start <= time <= end`.
///
/// Differs from [`locate`] at boundaries: it honours each cue's own end, so
/// gaps between cues yield `None` and the last cue can match.
pub fn locate_linear(intervals: &[CaptionInterval], time: f64) -> Option<&CaptionInterval> {
    intervals
        .iter()
        .find(|interval| time >= interval.start_secs && time <= interval.end_secs)
}
