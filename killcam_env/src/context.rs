//! Core environment context trait for the killcam frame loop.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the host environment so that the replay engine can
/// run in both production (tokio, wall clock) and simulation (virtual clock).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `Instant`
/// - **Simulation**: `SimContext` - manually advanced virtual clock
///
/// # Determinism
///
/// The frame loop derives every per-frame delta from `now()`, so a context
/// that controls `now()` controls playback completely.
#[async_trait]
pub trait KillcamContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Frame deltas are computed from successive calls.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;
    
    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);
    
    /// Spawns a background task (model loads run here).
    ///
    /// In production: `tokio::spawn`
    /// In simulation: `tokio::spawn` on a single-threaded runtime
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
    
    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
