//! The long-lived host of replays.
//!
//! A `ReplaySession` owns the invalidation token and the model-completion
//! channel. Loads run elsewhere and report back as [`LoadEvent`] messages;
//! only the frame loop (through [`ReplaySession::poll_loads`] or
//! [`ReplaySession::tick`]) applies them, and only when their generation
//! still matches. A completion for a torn-down replay is counted and dropped.

use std::time::Duration;

use killcam_env::{EnvError, ModelHandle};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::config::KillcamConfig;
use crate::error::{KillcamError, Result};
use crate::frame::FrameSnapshot;
use crate::payload::KillPayload;
use crate::playback::FrameClock;
use crate::replay::{ModelTicket, ReplayContext};
use crate::types::{EntitySlot, Generation, Role};

/// Completion of one model load.
#[derive(Debug)]
pub struct LoadEvent {
    pub generation: Generation,
    pub slot: EntitySlot,
    pub result: std::result::Result<ModelHandle, EnvError>,
}

impl LoadEvent {
    /// Completion for the load described by `ticket`.
    pub fn for_ticket(ticket: &ModelTicket, result: std::result::Result<ModelHandle, EnvError>) -> Self {
        Self {
            generation: ticket.generation,
            slot: ticket.slot,
            result,
        }
    }
}

/// Permission to render one frame of a specific generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameToken {
    pub generation: Generation,
}

/// Counters describing a session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub loads: u64,
    pub failed_loads: u64,
    pub teardowns: u64,
    pub frames: u64,
    /// Frames rendered for a generation that was gone
    pub cancelled_frames: u64,
    pub models_ready: u64,
    pub models_failed: u64,
    pub stale_callbacks: u64,
    pub duplicate_completions: u64,
}

/// Hosts at most one replay at a time.
#[derive(Debug)]
pub struct ReplaySession {
    config: KillcamConfig,
    generation: Generation,
    replay: Option<ReplayContext>,
    completions_tx: UnboundedSender<LoadEvent>,
    completions_rx: UnboundedReceiver<LoadEvent>,
    frame_clock: FrameClock,
    stats: SessionStats,
}

impl ReplaySession {
    pub fn new(config: KillcamConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            config,
            generation: Generation::default(),
            replay: None,
            completions_tx,
            completions_rx,
            frame_clock: FrameClock::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &KillcamConfig {
        &self.config
    }

    /// Current invalidation token.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn replay(&self) -> Option<&ReplayContext> {
        self.replay.as_ref()
    }

    pub fn replay_mut(&mut self) -> Option<&mut ReplayContext> {
        self.replay.as_mut()
    }

    pub fn is_loaded(&self) -> bool {
        self.replay.is_some()
    }

    /// Replaces the current replay with `payload`.
    ///
    /// The previous replay is torn down first, so a failed load leaves the
    /// session empty. The returned tickets carry the new generation.
    pub fn load_kill(&mut self, payload: &KillPayload) -> Result<Vec<ModelTicket>> {
        self.teardown();

        match ReplayContext::load(payload, &self.config, self.generation) {
            Ok((replay, tickets)) => {
                self.replay = Some(replay);
                self.stats.loads += 1;
                Ok(tickets)
            }
            Err(e) => {
                self.stats.failed_loads += 1;
                Err(e)
            }
        }
    }

    /// Sender for load tasks to report completions on.
    pub fn completion_sender(&self) -> UnboundedSender<LoadEvent> {
        self.completions_tx.clone()
    }

    /// Applies one completion.
    ///
    /// Returns `Ok(true)` when a model changed state, `Ok(false)` for a
    /// duplicate, and `StaleCallback` when the event belongs to another
    /// generation. Nothing changes in the stale case.
    pub fn handle_event(&mut self, event: LoadEvent) -> Result<bool> {
        if event.generation != self.generation {
            self.stats.stale_callbacks += 1;
            debug!(
                slot = %event.slot,
                received = %event.generation,
                current = %self.generation,
                "dropping stale model completion"
            );
            return Err(KillcamError::StaleCallback {
                received: event.generation,
                current: self.generation,
            });
        }

        let Some(replay) = self.replay.as_mut() else {
            return Err(KillcamError::NotLoaded);
        };

        let ok = event.result.is_ok();
        if replay.apply_model(event.slot, event.result) {
            if ok {
                self.stats.models_ready += 1;
            } else {
                self.stats.models_failed += 1;
            }
            Ok(true)
        } else {
            self.stats.duplicate_completions += 1;
            Ok(false)
        }
    }

    /// Drains every queued completion. Returns how many changed a model.
    pub fn poll_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.completions_rx.try_recv() {
            if let Ok(true) = self.handle_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// A token for the next frame, if a replay is loaded.
    pub fn request_frame(&self) -> Option<FrameToken> {
        self.replay.as_ref().map(|_| FrameToken {
            generation: self.generation,
        })
    }

    /// Runs one frame: drain completions, advance, place the camera.
    ///
    /// `now` is a monotonic clock reading. Returns `None` when the token's
    /// replay was torn down or nothing is loaded.
    pub fn tick(&mut self, token: FrameToken, now: Duration) -> Option<FrameSnapshot> {
        if token.generation != self.generation || self.replay.is_none() {
            self.stats.cancelled_frames += 1;
            return None;
        }

        self.poll_loads();
        let delta = self.frame_clock.delta(now);
        let replay = self.replay.as_mut()?;
        self.stats.frames += 1;
        Some(replay.step(delta))
    }

    /// Drops the current replay and invalidates everything issued for it.
    ///
    /// Safe to call with nothing loaded and with loads in flight.
    pub fn teardown(&mut self) {
        let previous = self.generation;
        self.generation = self.generation.next();
        self.frame_clock.reset();

        // Completions already queued are stale now
        while let Ok(event) = self.completions_rx.try_recv() {
            let _ = self.handle_event(event);
        }

        if let Some(replay) = self.replay.take() {
            self.stats.teardowns += 1;
            info!(
                impact_id = replay.impact_id(),
                from = %previous,
                to = %self.generation,
                "replay torn down"
            );
        }
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.loaded_mut()?.set_paused(paused);
        Ok(())
    }

    /// Flips pause and returns the new state.
    pub fn toggle_pause(&mut self) -> Result<bool> {
        Ok(self.loaded_mut()?.toggle_pause())
    }

    pub fn follow(&mut self, role: Role) -> Result<()> {
        self.loaded_mut()?.follow(role);
        Ok(())
    }

    pub fn look_at(&mut self, role: Role) -> Result<()> {
        self.loaded_mut()?.look_at(role);
        Ok(())
    }

    /// Restarts the loaded replay from the beginning.
    pub fn restart(&mut self) -> Result<()> {
        self.loaded_mut()?.reset();
        Ok(())
    }

    fn loaded_mut(&mut self) -> Result<&mut ReplayContext> {
        self.replay.as_mut().ok_or(KillcamError::NotLoaded)
    }
}
