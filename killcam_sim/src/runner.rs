//! Scenario runner - plays replays on the virtual clock and checks them.
//!
//! Every scenario drives a real `ReplayDriver` over a `SimContext` and a
//! `SimModelLoader`, on a single-threaded Tokio runtime. A `FrameRecorder`
//! sits in the sink position and checks the playback invariants on every
//! frame; the scenario itself then asserts what is specific to it.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use killcam_core::camera::CameraRig;
use killcam_core::config::KillcamConfig;
use killcam_core::driver::{FrameSink, ReplayDriver};
use killcam_core::frame::FrameSnapshot;
use killcam_core::payload::KillPayload;
use killcam_core::session::SessionStats;
use killcam_core::types::{EntitySlot, Role};
use killcam_core::KillcamError;
use killcam_env::KillcamContext;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::SimContext;
use crate::exporter::{ReplayExport, SimEvent};
use crate::fixtures::{straight_shot, KillGenerator};
use crate::loader::{LatencyModel, SimModelLoader};
use crate::scenarios::ScenarioId;
use crate::visualizer::RerunLogger;

/// Violations kept per run; later ones are only counted.
const MAX_VIOLATIONS: usize = 32;

type SimDriver = ReplayDriver<SimContext, SimModelLoader>;

/// What one run plays.
enum Job<'p> {
    Scenario(ScenarioId),
    Payload(&'p KillPayload),
}

/// Why a scenario did not pass.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("runtime setup failed: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Replay(#[from] KillcamError),

    #[error("{0}")]
    Check(String),
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Check(message()))
    }
}

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Frames presented
    pub total_frames: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Frame-by-frame export, when enabled
    #[serde(skip)]
    pub export: Option<ReplayExport>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Frames presented
    pub frames: u64,

    /// Frames with a camera pose
    pub camera_frames: u64,

    /// Frames drawn before the camera models were ready
    pub pending_camera_frames: u64,

    /// Loop restarts seen on the replay clock
    pub wraps: u64,

    /// Highest killer cursor reached
    pub killer_peak_cursor: usize,

    /// The killer advanced while the camera was still waiting
    pub moved_while_pending: bool,

    /// The weapon was drawn at least once
    pub weapon_drawn: bool,

    /// Per-frame invariant violations (first few only)
    pub violations: Vec<String>,

    /// Total invariant violations
    pub violation_count: u64,

    /// Hash over every presented position and pose
    pub frame_digest: u64,

    /// Session counters at the end of the run
    pub stats: SessionStats,
}

/// Frame sink that checks playback invariants as frames arrive.
pub struct FrameRecorder {
    reveal_stride: usize,

    /// Loop end of the loaded replay
    max_time: f64,

    previous: Option<FrameSnapshot>,
    metrics: ScenarioMetrics,
    digest: DefaultHasher,
    export: Option<ReplayExport>,
    logger: RerunLogger,
}

impl FrameRecorder {
    pub fn new(reveal_stride: usize, export: Option<ReplayExport>, logger: RerunLogger) -> Self {
        Self {
            reveal_stride,
            max_time: f64::INFINITY,
            previous: None,
            metrics: ScenarioMetrics::default(),
            digest: DefaultHasher::new(),
            export,
            logger,
        }
    }

    /// Points the checks at a freshly loaded replay.
    pub fn on_load(&mut self, max_time: f64) {
        self.max_time = max_time;
        self.previous = None;
    }

    /// Records a harness event.
    pub fn event(&mut self, event: SimEvent) {
        self.logger.log_event("events", &event.message);
        if let Some(export) = self.export.as_mut() {
            export.event(event);
        }
    }

    pub fn metrics(&self) -> &ScenarioMetrics {
        &self.metrics
    }

    /// Most recent frame.
    pub fn last(&self) -> Option<&FrameSnapshot> {
        self.previous.as_ref()
    }

    /// Cursor of `slot` in the most recent frame.
    pub fn last_cursor(&self, slot: EntitySlot) -> Option<usize> {
        self.last().and_then(|f| f.entity(slot)).map(|e| e.cursor_index)
    }

    fn violation(&mut self, message: String) {
        self.metrics.violation_count += 1;
        if self.metrics.violations.len() < MAX_VIOLATIONS {
            warn!(frame = self.metrics.frames, "{}", message);
            self.metrics.violations.push(message);
        }
    }

    fn check(&mut self, frame: &FrameSnapshot) {
        if frame.replay_time > self.max_time + 1e-9 {
            self.violation(format!(
                "replay time {:.3} past loop end {:.3}",
                frame.replay_time, self.max_time
            ));
        }

        for entity in &frame.entities {
            let expected = entity.cursor_index.saturating_sub(1) * self.reveal_stride;
            if entity.reveal_length != expected {
                self.violation(format!(
                    "{}: reveal {} for cursor {}, expected {}",
                    entity.slot, entity.reveal_length, entity.cursor_index, expected
                ));
            }
            if entity.drawable && !(entity.model_ready && entity.visible) {
                self.violation(format!("{}: drawn without a ready, visible model", entity.slot));
            }
        }

        if let Some(camera) = &frame.camera {
            let finite = camera.position.iter().chain(camera.look_at.iter()).all(|c| c.is_finite());
            if !finite {
                self.violation(format!("camera pose is not finite: {:?}", camera));
            }
        }

        let Some(prev) = self.previous.take() else {
            return;
        };
        if prev.generation != frame.generation {
            return;
        }

        if frame.replay_time < prev.replay_time {
            self.metrics.wraps += 1;
        }

        let before: HashMap<EntitySlot, usize> =
            prev.entities.iter().map(|e| (e.slot, e.cursor_index)).collect();
        for entity in &frame.entities {
            let Some(&was) = before.get(&entity.slot) else {
                continue;
            };
            if prev.paused && frame.paused && entity.cursor_index != was {
                self.violation(format!(
                    "{}: cursor moved {} -> {} while paused",
                    entity.slot, was, entity.cursor_index
                ));
            }
            if entity.cursor_index < was && entity.cursor_index != 0 {
                self.violation(format!(
                    "{}: cursor went back {} -> {}",
                    entity.slot, was, entity.cursor_index
                ));
            }
        }

        if frame.camera.is_none() {
            let killer = EntitySlot::from(Role::Killer);
            let moved = match (prev.entity(killer), frame.entity(killer)) {
                (Some(a), Some(b)) => a.cursor_index != b.cursor_index,
                _ => false,
            };
            self.metrics.moved_while_pending |= moved;
        }
    }

    fn fold_digest(&mut self, frame: &FrameSnapshot) {
        frame.replay_time.to_bits().hash(&mut self.digest);
        for entity in &frame.entities {
            entity.cursor_index.hash(&mut self.digest);
            for c in entity.position.iter() {
                c.to_bits().hash(&mut self.digest);
            }
        }
        if let Some(camera) = &frame.camera {
            for c in camera.position.iter() {
                c.to_bits().hash(&mut self.digest);
            }
        }
    }

    fn finish(mut self, stats: SessionStats) -> (ScenarioMetrics, Option<ReplayExport>) {
        self.metrics.frame_digest = self.digest.finish();
        self.metrics.stats = stats;
        (self.metrics, self.export)
    }
}

impl FrameSink for FrameRecorder {
    fn present(&mut self, frame: &FrameSnapshot) {
        self.check(frame);
        self.fold_digest(frame);

        self.metrics.frames += 1;
        if frame.camera.is_some() {
            self.metrics.camera_frames += 1;
        } else {
            self.metrics.pending_camera_frames += 1;
        }
        if let Some(killer) = frame.entity(Role::Killer.into()) {
            self.metrics.killer_peak_cursor = self.metrics.killer_peak_cursor.max(killer.cursor_index);
        }
        if frame.entity(Role::Weapon.into()).is_some_and(|w| w.drawable) {
            self.metrics.weapon_drawn = true;
        }

        self.logger.log_frame(frame);
        if let Some(export) = self.export.as_mut() {
            export.present(frame);
        }
        self.previous = Some(frame.clone());
    }
}

/// Runs replay scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Virtual seconds of playback per scenario
    duration_secs: f64,

    /// Latency for scenarios that don't pick their own
    load_latency: LatencyModel,

    config: KillcamConfig,
    record_export: bool,
    visualize: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            duration_secs: 12.0,
            load_latency: LatencyModel::default(),
            config: KillcamConfig::default(),
            record_export: false,
            visualize: false,
        }
    }

    /// Sets the frame rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.config.playback.frame_rate_hz = hz.max(1);
        self
    }

    /// Sets the playback duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs.max(0.0);
        self
    }

    pub fn with_load_latency(mut self, latency: LatencyModel) -> Self {
        self.load_latency = latency;
        self
    }

    /// Replaces the engine configuration (frame rate included).
    pub fn with_config(mut self, config: KillcamConfig) -> Self {
        self.config = config;
        self
    }

    /// Keeps a frame-by-frame export in the result.
    pub fn with_export(mut self) -> Self {
        self.record_export = true;
        self
    }

    /// Streams frames to a Rerun viewer (needs the `visualization` feature).
    pub fn with_visualization(mut self) -> Self {
        self.visualize = true;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("{}", scenario.description());
        self.execute(scenario.name(), Job::Scenario(scenario))
    }

    /// Plays an arbitrary payload with the configured load latency.
    ///
    /// Only the per-frame invariants apply.
    pub fn play_payload(&self, payload: &KillPayload) -> ScenarioResult {
        info!(impact_id = payload.impact_id, "Playing payload (seed={})", self.seed);
        self.execute("payload", Job::Payload(payload))
    }

    fn execute(&self, name: &str, job: Job<'_>) -> ScenarioResult {
        let logger = if self.visualize {
            RerunLogger::new(&format!("killcam_sim/{}", name))
        } else {
            RerunLogger::disabled()
        };
        let export = self.record_export.then(|| ReplayExport::new(name, self.seed));
        let mut rec = FrameRecorder::new(self.config.playback.reveal_stride, export, logger);
        let context = SimContext::shared(self.seed);

        let outcome = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime.block_on(self.dispatch(job, Arc::clone(&context), &mut rec)),
            Err(e) => Err(ScenarioError::from(e)),
        };

        let (stats, error) = match outcome {
            Ok(stats) => (stats, None),
            Err(e) => (SessionStats::default(), Some(e.to_string())),
        };
        let (metrics, mut export) = rec.finish(stats);

        let failure_reason = error.or_else(|| {
            metrics.violations.first().map(|first| {
                format!("{} invariant violation(s), first: {}", metrics.violation_count, first)
            })
        });
        let passed = failure_reason.is_none();

        if let Some(export) = export.as_mut() {
            export.finalize(passed, metrics.stats.clone());
        }

        if passed {
            info!("{}: {} frames, {} camera frames", name, metrics.frames, metrics.camera_frames);
        } else {
            warn!("{}: {}", name, failure_reason.as_deref().unwrap_or("unknown"));
        }

        ScenarioResult {
            scenario: name.to_string(),
            seed: self.seed,
            passed,
            total_frames: metrics.frames,
            final_time_secs: context.now().as_secs_f64(),
            failure_reason,
            metrics,
            export,
        }
    }

    async fn dispatch(
        &self,
        job: Job<'_>,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        match job {
            Job::Scenario(ScenarioId::StraightShot) => self.run_straight_shot(context, rec).await,
            Job::Scenario(ScenarioId::LateModels) => self.run_late_models(context, rec).await,
            Job::Scenario(ScenarioId::TeardownRace) => self.run_teardown_race(context, rec).await,
            Job::Scenario(ScenarioId::FollowSwitch) => self.run_follow_switch(context, rec).await,
            Job::Scenario(ScenarioId::PauseResume) => self.run_pause_resume(context, rec).await,
            Job::Scenario(ScenarioId::Crowd) => self.run_crowd(context, rec).await,
            Job::Payload(payload) => {
                let mut driver = self.driver(context, self.load_latency);
                self.load(&mut driver, payload, rec)?;
                driver.run_frames(self.frame_count(), rec).await;
                Ok(driver.session().stats().clone())
            }
        }
    }

    fn frame_count(&self) -> usize {
        self.frames_for(self.duration_secs)
    }

    fn frames_for(&self, secs: f64) -> usize {
        (secs * self.config.playback.frame_rate_hz as f64).round() as usize
    }

    fn driver(&self, context: Arc<SimContext>, latency: LatencyModel) -> SimDriver {
        let loader = SimModelLoader::new(Arc::clone(&context), latency);
        ReplayDriver::new(context, Arc::new(loader), self.config.clone())
    }

    fn load(
        &self,
        driver: &mut SimDriver,
        payload: &KillPayload,
        rec: &mut FrameRecorder,
    ) -> Result<usize, ScenarioError> {
        let tickets = driver.load(payload)?;
        if let Some(replay) = driver.session().replay() {
            rec.on_load(replay.max_time());
        }
        rec.event(SimEvent::info(format!(
            "loaded impact {} with {} model loads",
            payload.impact_id, tickets
        )));
        Ok(tickets)
    }

    /// KC-001: StraightShot - the reference kill with instant models.
    ///
    /// **Assertion**: camera placed, killer reaches the end of its curve,
    /// and the loop wraps once playback outlasts the replay.
    async fn run_straight_shot(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-001: StraightShot");
        let payload = straight_shot();
        let mut driver = self.driver(context, LatencyModel::instant());
        let tickets = self.load(&mut driver, &payload, rec)?;
        ensure(tickets == 3, || format!("expected 3 model loads, got {}", tickets))?;

        let killer_len = driver
            .session()
            .replay()
            .and_then(|r| r.primaries().killer.as_ref())
            .map(|k| k.track.len())
            .unwrap_or(0);

        driver.run_frames(self.frame_count(), rec).await;

        let m = rec.metrics();
        ensure(m.camera_frames > 0, || "camera never placed".to_string())?;

        let span = payload.max_ts - payload.min_ts;
        if self.duration_secs > span + 0.5 {
            ensure(m.wraps >= 1, || "playback outlasted the replay but never wrapped".to_string())?;
            ensure(m.killer_peak_cursor + 2 >= killer_len, || {
                format!("killer peaked at {} of {} points", m.killer_peak_cursor, killer_len)
            })?;
        }

        Ok(driver.session().stats().clone())
    }

    /// KC-002: LateModels - loads take seconds of replay time.
    ///
    /// **Assertion**: tracks move while the camera waits, and the camera
    /// appears once the follow and look models land.
    async fn run_late_models(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-002: LateModels");
        let mut driver = self.driver(context, LatencyModel::new(2500.0, 400.0));
        self.load(&mut driver, &straight_shot(), rec)?;

        driver.run_frames(self.frame_count(), rec).await;

        let m = rec.metrics();
        ensure(m.pending_camera_frames > 0, || "camera was ready before any model landed".to_string())?;
        ensure(m.moved_while_pending, || "killer stood still while models loaded".to_string())?;
        ensure(rec.last().is_some_and(|f| f.camera.is_some()), || {
            "camera never appeared after models loaded".to_string()
        })?;

        let stats = driver.session().stats().clone();
        ensure(stats.models_ready == 3, || format!("{} models ready, expected 3", stats.models_ready))?;
        Ok(stats)
    }

    /// KC-003: TeardownRace - reload while the first replay's loads are in flight.
    ///
    /// **Assertion**: every completion for the first replay is dropped as
    /// stale, the second replay gets all its models, and a torn-down driver
    /// stops presenting frames.
    async fn run_teardown_race(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-003: TeardownRace");
        let mut driver = self.driver(context, LatencyModel::new(500.0, 100.0));

        let first = self.load(&mut driver, &straight_shot(), rec)?;
        driver.run_frames(5, rec).await;

        let second_payload = KillGenerator::new(self.seed).pursuit(2);
        let second = self.load(&mut driver, &second_payload, rec)?;
        rec.event(SimEvent::warn(format!("reloaded with {} loads in flight", first)));
        driver.run_frames(self.frames_for(2.0), rec).await;

        let stats = driver.session().stats().clone();
        ensure(stats.stale_callbacks == first as u64, || {
            format!("{} stale completions, expected {}", stats.stale_callbacks, first)
        })?;
        ensure(stats.models_ready == second as u64, || {
            format!("{} models ready, expected {}", stats.models_ready, second)
        })?;
        ensure(driver.session().replay().is_some_and(|r| r.pending_models() == 0), || {
            "second replay still has pending models".to_string()
        })?;

        driver.teardown();
        driver.teardown();
        rec.event(SimEvent::info("torn down"));
        let presented = driver.run_frames(5, rec).await;
        ensure(presented == 0, || format!("{} frames presented after teardown", presented))?;

        let stats = driver.session().stats().clone();
        ensure(stats.teardowns == 2, || format!("{} teardowns counted, expected 2", stats.teardowns))?;
        Ok(stats)
    }

    /// KC-004: FollowSwitch - cycle follow roles and a look override.
    ///
    /// **Assertion**: every frame's pose is exactly the rig's pose for that
    /// frame's follow and look positions.
    async fn run_follow_switch(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-004: FollowSwitch");
        let mut driver = self.driver(context, LatencyModel::instant());
        self.load(&mut driver, &straight_shot(), rec)?;
        let rig = CameraRig::new(self.config.camera.clone());

        let phases: [(Role, Option<Role>); 4] = [
            (Role::Killer, None),
            (Role::Target, None),
            (Role::Weapon, None),
            (Role::Killer, Some(Role::Weapon)),
        ];
        let per_phase = (self.frame_count() / phases.len()).max(1);
        let mut checked = 0;

        for (follow, look) in phases {
            driver.session_mut().follow(follow)?;
            if let Some(look) = look {
                driver.session_mut().look_at(look)?;
            }
            rec.event(SimEvent::info(format!("follow {} look {:?}", follow, look)));

            for _ in 0..per_phase {
                driver.run_frames(1, rec).await;
                let (Some(frame), Some(replay)) = (rec.last(), driver.session().replay()) else {
                    continue;
                };
                let selection = replay.selection();
                ensure(selection.follow() == follow, || "follow role drifted".to_string())?;
                ensure(selection.look() == look.unwrap_or(follow.derived_look()), || {
                    format!("look role {} for follow {}", selection.look(), follow)
                })?;

                let (Some(f), Some(l)) = (
                    frame.entity(selection.follow().into()),
                    frame.entity(selection.look().into()),
                ) else {
                    continue;
                };
                if !(f.model_ready && l.model_ready) {
                    continue;
                }
                let expected = rig.compute(f.position, l.position);
                let actual = frame.camera.ok_or_else(|| {
                    ScenarioError::Check("camera missing with both models ready".to_string())
                })?;
                ensure(
                    (actual.position - expected.position).norm() < 1e-9
                        && (actual.look_at - expected.look_at).norm() < 1e-9,
                    || format!("pose off the rig for follow {} look {}", follow, selection.look()),
                )?;
                checked += 1;
            }
        }

        ensure(checked > 0, || "no frame had both camera models ready".to_string())?;
        Ok(driver.session().stats().clone())
    }

    /// KC-005: PauseResume - pause, resume and restart mid-replay.
    ///
    /// **Assertion**: cursors hold while paused (checked per frame), resume
    /// moves them on, restart puts them back at the start.
    async fn run_pause_resume(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-005: PauseResume");
        let mut driver = self.driver(context, LatencyModel::instant());
        self.load(&mut driver, &straight_shot(), rec)?;

        driver.run_frames(self.frames_for(2.0), rec).await;
        driver.session_mut().set_paused(true)?;
        rec.event(SimEvent::info("paused"));
        driver.run_frames(1, rec).await;
        let held = rec.last_cursor(Role::Killer.into());

        driver.run_frames(self.frames_for(1.0), rec).await;
        ensure(rec.last_cursor(Role::Killer.into()) == held, || "killer moved while paused".to_string())?;
        ensure(rec.last().is_some_and(|f| f.paused && f.camera.is_some()), || {
            "paused frames lost the camera".to_string()
        })?;

        // Two toggles land back on paused
        driver.session_mut().toggle_pause()?;
        let paused = driver.session_mut().toggle_pause()?;
        ensure(paused, || "double toggle left the replay running".to_string())?;

        driver.session_mut().set_paused(false)?;
        rec.event(SimEvent::info("resumed"));
        driver.run_frames(self.frames_for(2.0), rec).await;
        ensure(rec.last_cursor(Role::Killer.into()) > held, || "killer did not move after resume".to_string())?;

        driver.session_mut().restart()?;
        rec.event(SimEvent::info("restarted"));
        let rewound = driver
            .session()
            .replay()
            .and_then(|r| r.primaries().killer.as_ref())
            .map(|k| k.track.cursor_index());
        ensure(rewound == Some(0), || format!("restart left killer at {:?}", rewound))?;

        driver.run_frames(self.frames_for(1.0), rec).await;
        Ok(driver.session().stats().clone())
    }

    /// KC-006: Crowd - seeded pursuit with bystanders and one broken mesh.
    ///
    /// **Assertion**: the short bystander is skipped, the failed weapon
    /// model never blocks or draws, every other model lands.
    async fn run_crowd(
        &self,
        context: Arc<SimContext>,
        rec: &mut FrameRecorder,
    ) -> Result<SessionStats, ScenarioError> {
        info!("KC-006: Crowd");
        let bystanders = 12;
        let payload = KillGenerator::new(self.seed).with_short_bystander().pursuit(bystanders);

        let loader = SimModelLoader::new(Arc::clone(&context), self.load_latency)
            .with_failing_asset(self.config.style.munition_model.clone());
        let mut driver = ReplayDriver::new(context, Arc::new(loader), self.config.clone());

        let tickets = self.load(&mut driver, &payload, rec)?;
        ensure(tickets == bystanders + 3, || {
            format!("{} model loads, expected {}", tickets, bystanders + 3)
        })?;
        ensure(driver.session().replay().is_some_and(|r| r.bystanders().len() == bystanders), || {
            "short bystander was not skipped".to_string()
        })?;

        driver.run_frames(self.frame_count(), rec).await;

        let stats = driver.session().stats().clone();
        ensure(stats.models_failed == 1, || format!("{} models failed, expected 1", stats.models_failed))?;
        ensure(stats.models_ready == tickets as u64 - 1, || {
            format!("{} models ready, expected {}", stats.models_ready, tickets - 1)
        })?;
        ensure(!rec.metrics().weapon_drawn, || "weapon drawn without a model".to_string())?;
        ensure(rec.metrics().camera_frames > 0, || "camera never placed".to_string())?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_straight_shot_scenario() {
        let runner = ScenarioRunner::new(42);
        let result = runner.run(ScenarioId::StraightShot);

        assert!(result.passed, "StraightShot failed: {:?}", result.failure_reason);
        assert_eq!(result.total_frames, 720);
        assert!(result.metrics.wraps >= 1);
        assert_eq!(result.metrics.stats.models_ready, 3);
    }

    #[test]
    fn test_late_models_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::LateModels);
        assert!(result.passed, "LateModels failed: {:?}", result.failure_reason);
        assert!(result.metrics.pending_camera_frames > 0);
    }

    #[test]
    fn test_teardown_race_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::TeardownRace);
        assert!(result.passed, "TeardownRace failed: {:?}", result.failure_reason);
        assert_eq!(result.metrics.stats.stale_callbacks, 3);
        assert_eq!(result.metrics.stats.loads, 2);
    }

    #[test]
    fn test_follow_switch_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::FollowSwitch);
        assert!(result.passed, "FollowSwitch failed: {:?}", result.failure_reason);
    }

    #[test]
    fn test_pause_resume_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::PauseResume);
        assert!(result.passed, "PauseResume failed: {:?}", result.failure_reason);
        assert_eq!(result.metrics.violation_count, 0);
    }

    #[test]
    fn test_crowd_deterministic() {
        let runner = ScenarioRunner::new(7);
        let a = runner.run(ScenarioId::Crowd);
        let b = runner.run(ScenarioId::Crowd);

        assert!(a.passed, "Crowd failed: {:?}", a.failure_reason);
        assert_eq!(a.metrics, b.metrics);

        let c = ScenarioRunner::new(8).run(ScenarioId::Crowd);
        assert_ne!(a.metrics.frame_digest, c.metrics.frame_digest);
    }

    #[test]
    fn test_export_recorded() {
        let result = ScenarioRunner::new(1)
            .with_duration(2.0)
            .with_export()
            .run(ScenarioId::StraightShot);

        let export = result.export.expect("export requested");
        assert_eq!(export.frames.len(), 120);
        assert!(export.passed);
        assert!(!export.frames[0].events.is_empty());
    }

    #[test]
    fn test_play_payload() {
        let payload = KillGenerator::new(3).with_duration(10.0).pursuit(1);
        let result = ScenarioRunner::new(3)
            .with_load_latency(LatencyModel::instant())
            .with_tick_rate(30)
            .play_payload(&payload);

        assert!(result.passed, "payload failed: {:?}", result.failure_reason);
        assert_eq!(result.total_frames, 360);
        assert_eq!(result.metrics.stats.models_ready, 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_generated_kills_play_cleanly(seed in 1u64..10_000, bystanders in 0usize..4) {
            let payload = KillGenerator::new(seed)
                .with_duration(8.0)
                .with_short_bystander()
                .pursuit(bystanders);
            let result = ScenarioRunner::new(seed)
                .with_duration(9.0)
                .with_tick_rate(20)
                .with_load_latency(LatencyModel::new(200.0, 50.0))
                .play_payload(&payload);

            prop_assert!(result.passed, "seed {}: {:?}", seed, result.failure_reason);
            prop_assert_eq!(result.metrics.violation_count, 0);
            prop_assert!(result.metrics.wraps >= 1);
            prop_assert_eq!(result.metrics.stats.models_ready, bystanders as u64 + 3);
        }
    }

    #[test]
    fn test_recorder_flags_paused_motion() {
        use killcam_core::replay::ReplayContext;
        use killcam_core::types::Generation;

        let (mut replay, _) =
            ReplayContext::load(&straight_shot(), &KillcamConfig::default(), Generation(1)).unwrap();
        let mut rec = FrameRecorder::new(6, None, RerunLogger::disabled());
        rec.on_load(replay.max_time());

        replay.set_paused(true);
        let mut frozen = replay.step(0.1);
        rec.present(&frozen);
        frozen.entities[0].cursor_index += 1;
        frozen.entities[0].reveal_length = 0;
        rec.present(&frozen);

        assert_eq!(rec.metrics().violation_count, 1);
    }
}
