//! The Playback Clock & Indexer.
//!
//! Advances per-track elapsed time once per frame and maps it onto a curve
//! index with a forward-only scan. Past the loop end every track snaps back to
//! the loop start and hides until it moves again.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::PlaybackConfig;
use crate::error::{KillcamError, Result};
use crate::track::Track;

/// What one `advance` call did to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advance {
    /// Nothing changed index-wise
    Idle,
    /// The cursor moved forward by this many points
    Stepped(usize),
    /// Elapsed time passed the loop end; the track restarted
    Wrapped,
}

/// Ribbon vertices per curve point unless configured otherwise.
const DEFAULT_REVEAL_STRIDE: NonZeroUsize = match NonZeroUsize::new(6) {
    Some(stride) => stride,
    None => panic!("default reveal stride is zero"),
};

/// Stateless per-frame stepping of tracks.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    reveal_stride: NonZeroUsize,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_STRIDE)
    }
}

impl PlaybackClock {
    /// Creates a clock exposing `reveal_stride` ribbon vertices per point.
    pub fn new(reveal_stride: NonZeroUsize) -> Self {
        Self { reveal_stride }
    }

    /// Fails with `InvalidConfig` on a zero stride.
    pub fn from_config(config: &PlaybackConfig) -> Result<Self> {
        NonZeroUsize::new(config.reveal_stride)
            .map(Self::new)
            .ok_or_else(|| KillcamError::invalid_config("reveal_stride must be at least 1"))
    }

    pub fn reveal_stride(&self) -> usize {
        self.reveal_stride.get()
    }

    /// Advances one track by `delta_seconds`.
    ///
    /// Non-positive or non-finite deltas are ignored, and so is a track
    /// without points. The scan resumes at the current cursor and stops at
    /// the last index, so the cursor never overruns the curve.
    pub fn advance(&self, track: &mut Track, delta_seconds: f64) -> Advance {
        if !(delta_seconds.is_finite() && delta_seconds > 0.0) {
            return Advance::Idle;
        }
        let Some(last) = track.len().checked_sub(1) else {
            return Advance::Idle;
        };

        track.elapsed += delta_seconds;

        if track.elapsed > track.max_time {
            trace!(elapsed = track.elapsed, max = track.max_time, "track wrapped");
            track.elapsed = track.min_time;
            track.cursor_index = 0;
            track.reveal_length = 0;
            track.visible = false;
            return Advance::Wrapped;
        }

        let start = track.cursor_index;
        while track.cursor_index < last && track.time_steps()[track.cursor_index + 1] <= track.elapsed {
            track.cursor_index += 1;
        }

        let stepped = track.cursor_index - start;
        if stepped == 0 {
            return Advance::Idle;
        }

        track.visible = true;
        track.reveal_length = track.cursor_index.saturating_sub(1) * self.reveal_stride.get();
        Advance::Stepped(stepped)
    }

    /// Puts every track back in its just-loaded state.
    pub fn reset_all<'a>(&self, tracks: impl IntoIterator<Item = &'a mut Track>) {
        for track in tracks {
            track.reset_to_start();
        }
    }
}

/// Converts a monotonic clock reading into per-frame deltas.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Duration>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; the first call yields 0.
    pub fn delta(&mut self, now: Duration) -> f64 {
        let delta = match self.last {
            Some(last) => now.saturating_sub(last).as_secs_f64(),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }

    /// Forgets the previous reading.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
