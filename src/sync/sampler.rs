//! Clock sampling and the session's scheduled task
//!
//! The sampler is a plain tokio interval. Ticks are awaited one at a time by
//! the session loop, so two evaluations can never overlap; ticks missed while
//! the coordinator waits are skipped rather than burst.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::SamplerConfig;
use crate::platform::PlaybackElement;

/// Reads the playback clock at a fixed period
pub struct ClockSampler {
    player: Arc<dyn PlaybackElement>,
    interval: Interval,
    lookahead_secs: f64,
}

impl ClockSampler {
    /// The first sample is taken immediately
    pub fn new(player: Arc<dyn PlaybackElement>, config: &SamplerConfig) -> Self {
        let mut interval = tokio::time::interval(config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            player,
            interval,
            lookahead_secs: config.lookahead_secs,
        }
    }

    /// Wait for the next tick, then return the playback position plus the
    /// lookahead
    pub async fn next_sample(&mut self) -> f64 {
        self.interval.tick().await;
        self.player.current_time() + self.lookahead_secs
    }
}

/// Handle to a spawned task, owned by exactly one session.
///
/// Cancelling is idempotent and dropping the handle cancels the task, so a
/// task can never outlive its owner.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
