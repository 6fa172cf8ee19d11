//! Replay Driver - runs a `ReplaySession` against an environment context.
//!
//! The session itself is synchronous. The driver supplies what it lacks:
//! a clock to derive frame deltas from, background tasks for model loads,
//! and a frame cadence.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ReplayDriver                          │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Context: KillcamContext                                │  │
//! │  │  • now()   → frame deltas                              │  │
//! │  │  • sleep() → frame cadence                             │  │
//! │  │  • spawn() → one task per model load                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │ tickets                        ▲ LoadEvent          │
//! │        ▼                                │                    │
//! │  ┌───────────┐   load(request)   ┌─────────────┐             │
//! │  │  Session  │ ────────────────▶ │ ModelLoader │             │
//! │  └───────────┘                   └─────────────┘             │
//! │        │ FrameSnapshot                                       │
//! │        ▼                                                     │
//! │    FrameSink                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use killcam_core::driver::ReplayDriver;
//! use killcam_env::{FsModelLoader, TokioContext};
//!
//! let mut driver = ReplayDriver::new(
//!     TokioContext::shared(),
//!     Arc::new(FsModelLoader::new("assets")),
//!     KillcamConfig::default(),
//! );
//! driver.load(&payload)?;
//! let mut frames = Vec::new();
//! driver.run_frames(600, &mut frames).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use killcam_env::{KillcamContext, ModelLoader};
use tracing::{debug, warn};

use crate::config::KillcamConfig;
use crate::error::Result;
use crate::frame::FrameSnapshot;
use crate::payload::KillPayload;
use crate::session::{LoadEvent, ReplaySession};

/// Receives rendered frames.
pub trait FrameSink {
    fn present(&mut self, frame: &FrameSnapshot);
}

impl FrameSink for Vec<FrameSnapshot> {
    fn present(&mut self, frame: &FrameSnapshot) {
        self.push(frame.clone());
    }
}

/// Drives replays in a given environment.
///
/// Generic over the context and the model loader, so the same frame loop
/// runs against the wall clock and real assets, or against a virtual clock
/// and a scripted loader.
pub struct ReplayDriver<Ctx, L>
where
    Ctx: KillcamContext,
    L: ModelLoader,
{
    /// Environment context
    pub context: Arc<Ctx>,

    /// Model loader shared with load tasks
    pub loader: Arc<L>,

    session: ReplaySession,
    frame_interval: Duration,
}

impl<Ctx, L> ReplayDriver<Ctx, L>
where
    Ctx: KillcamContext,
    L: ModelLoader,
{
    pub fn new(context: Arc<Ctx>, loader: Arc<L>, config: KillcamConfig) -> Self {
        let frame_interval = config.playback.frame_interval();
        Self {
            context,
            loader,
            session: ReplaySession::new(config),
            frame_interval,
        }
    }

    pub fn session(&self) -> &ReplaySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ReplaySession {
        &mut self.session
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Loads `payload` and spawns one model load per entity.
    ///
    /// Returns the number of loads started.
    pub fn load(&mut self, payload: &KillPayload) -> Result<usize> {
        let tickets = self.session.load_kill(payload)?;
        let count = tickets.len();

        for ticket in tickets {
            let loader = Arc::clone(&self.loader);
            let completions = self.session.completion_sender();
            let name = format!("load-{}-{}", ticket.slot, ticket.generation);

            self.context.spawn(&name, async move {
                let result = loader.load(ticket.request.clone()).await;
                if completions.send(LoadEvent::for_ticket(&ticket, result)).is_err() {
                    debug!(slot = %ticket.slot, "session gone before model load finished");
                }
            });
        }

        Ok(count)
    }

    /// Runs up to `frames` frames, presenting each to `sink`.
    ///
    /// Stops early when the replay is torn down. Returns the number of
    /// frames presented.
    pub async fn run_frames<S: FrameSink>(&mut self, frames: usize, sink: &mut S) -> usize {
        let mut presented = 0;
        for _ in 0..frames {
            self.context.sleep(self.frame_interval).await;

            let Some(token) = self.session.request_frame() else {
                warn!("no replay loaded, stopping frame loop");
                break;
            };
            let now = self.context.now();
            if let Some(frame) = self.session.tick(token, now) {
                sink.present(&frame);
                presented += 1;
            }
        }
        presented
    }

    /// Tears down the current replay; in-flight loads become stale.
    pub fn teardown(&mut self) {
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::tests::straight_kill;
    use crate::types::Role;
    use async_trait::async_trait;
    use killcam_env::{EnvError, ModelHandle, ModelRequest};
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Virtual clock that jumps forward on every sleep.
    struct StepContext {
        now_us: AtomicU64,
    }

    #[async_trait]
    impl KillcamContext for StepContext {
        fn now(&self) -> Duration {
            Duration::from_micros(self.now_us.load(Ordering::SeqCst))
        }

        async fn sleep(&self, duration: Duration) {
            self.now_us.fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }

        fn spawn<F>(&self, _name: &str, future: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(future);
        }

        fn seed(&self) -> u64 {
            7
        }
    }

    /// Loads instantly; fails any asset containing "Missile".
    struct ScriptedLoader;

    #[async_trait]
    impl ModelLoader for ScriptedLoader {
        async fn load(&self, request: ModelRequest) -> std::result::Result<ModelHandle, EnvError> {
            if request.asset.contains("Missile") {
                Err(EnvError::load_failed("no missile mesh"))
            } else {
                Ok(ModelHandle::new(request.asset, 128))
            }
        }
    }

    fn driver() -> ReplayDriver<StepContext, ScriptedLoader> {
        let config = KillcamConfig::default();
        ReplayDriver::new(
            Arc::new(StepContext { now_us: AtomicU64::new(0) }),
            Arc::new(ScriptedLoader),
            config,
        )
    }

    #[tokio::test]
    async fn test_driver_loads_and_presents_frames() {
        let mut driver = driver();
        assert_eq!(driver.load(&straight_kill()).unwrap(), 3);

        let mut frames: Vec<FrameSnapshot> = Vec::new();
        let presented = driver.run_frames(30, &mut frames).await;
        assert_eq!(presented, 30);
        assert_eq!(frames.len(), 30);

        let last = frames.last().unwrap();
        assert!(last.camera.is_some());
        assert!(last.replay_time > 0.0);

        // Weapon mesh failed: never drawn, never blocks the others
        let weapon = last.entity(Role::Weapon.into()).unwrap();
        assert!(!weapon.model_ready);
        assert!(last.entity(Role::Killer.into()).unwrap().model_ready);

        let stats = driver.session().stats();
        assert_eq!(stats.models_ready, 2);
        assert_eq!(stats.models_failed, 1);
    }

    #[tokio::test]
    async fn test_driver_teardown_with_loads_in_flight() {
        let mut driver = driver();
        driver.load(&straight_kill()).unwrap();
        driver.teardown();

        let mut frames: Vec<FrameSnapshot> = Vec::new();
        assert_eq!(driver.run_frames(5, &mut frames).await, 0);

        // Let the orphaned load tasks finish, then drain them
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        driver.session_mut().poll_loads();
        assert_eq!(driver.session().stats().stale_callbacks, 3);
    }
}
