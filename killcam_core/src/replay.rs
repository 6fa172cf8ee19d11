//! One loaded replay.
//!
//! `ReplayContext` owns every piece of per-replay state: tracks, model
//! states, camera selection and the pause flag. It is built in one go from a
//! payload and dropped as a whole on teardown, so nothing from a previous kill
//! can leak into the next one.

use killcam_env::{EnvError, ModelHandle, ModelRequest};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::camera::{CameraPose, CameraRig, CameraSelection};
use crate::config::KillcamConfig;
use crate::entity::{Entity, PrimaryTracks};
use crate::error::Result;
use crate::frame::{EntityFrame, FrameSnapshot};
use crate::payload::{EntityRecord, KillPayload};
use crate::playback::PlaybackClock;
use crate::track::build_entity_track;
use crate::types::{BystanderId, EntitySlot, Generation, Role};

/// A model load the host must perform for a freshly loaded replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTicket {
    pub generation: Generation,
    pub slot: EntitySlot,
    pub request: ModelRequest,
}

/// State of one loaded replay.
#[derive(Debug, Clone)]
pub struct ReplayContext {
    generation: Generation,
    impact_id: i64,
    impact_distance: Option<f64>,
    min_time: f64,
    max_time: f64,

    clock: PlaybackClock,
    rig: CameraRig,

    primaries: PrimaryTracks,
    bystanders: Vec<Entity>,

    selection: CameraSelection,
    paused: bool,

    /// Last successfully computed pose
    camera: Option<CameraPose>,

    ground_anchor: Vector3<f64>,
}

impl ReplayContext {
    /// Builds every track of `payload` and lists the models to load.
    ///
    /// The target is required: if its track cannot be built the load fails.
    /// Any other entity with unusable data is left out with a warning.
    pub fn load(
        payload: &KillPayload,
        config: &KillcamConfig,
        generation: Generation,
    ) -> Result<(Self, Vec<ModelTicket>)> {
        config.validate()?;
        payload.validate()?;

        let build = |slot: EntitySlot, record: &EntityRecord| -> Result<Entity> {
            let track = build_entity_track(&slot.to_string(), &record.samples(), &config.track)?
                .with_loop_bounds(payload.min_ts, payload.max_ts);
            let category = record.category();
            let style = config.style.resolve(category, &record.color);
            Ok(Entity::new(slot, &record.name, &record.kind, category, style, track))
        };

        let target = build(Role::Target.into(), &payload.target)?;
        let killer = degrade(build(Role::Killer.into(), &payload.killer));
        let weapon = degrade(build(Role::Weapon.into(), &payload.weapon));
        let bystanders: Vec<Entity> = payload
            .other
            .iter()
            .enumerate()
            .filter_map(|(i, record)| degrade(build(EntitySlot::Bystander(BystanderId(i)), record)))
            .collect();

        let final_target = target.track.final_position();
        let ground_anchor = Vector3::new(final_target.x, 0.0, final_target.z);

        let context = Self {
            generation,
            impact_id: payload.impact_id,
            impact_distance: payload.impact_dist.meters(),
            min_time: payload.min_ts,
            max_time: payload.max_ts,
            clock: PlaybackClock::from_config(&config.playback)?,
            rig: CameraRig::new(config.camera.clone()),
            primaries: PrimaryTracks {
                killer,
                weapon,
                target,
            },
            bystanders,
            selection: CameraSelection::new(config.follow.0),
            paused: false,
            camera: None,
            ground_anchor,
        };

        let tickets: Vec<ModelTicket> = context
            .entities()
            .map(|e| ModelTicket {
                generation,
                slot: e.slot,
                request: e.model_request(),
            })
            .collect();

        info!(
            impact_id = payload.impact_id,
            generation = %generation,
            entities = tickets.len(),
            bystanders = context.bystanders.len(),
            "replay loaded"
        );

        Ok((context, tickets))
    }

    /// Advances one frame and returns what to draw.
    ///
    /// Tracks only move while unpaused. The camera is recomputed either way
    /// and keeps its previous pose while a camera model is still loading.
    pub fn step(&mut self, delta_seconds: f64) -> FrameSnapshot {
        if !self.paused {
            let clock = self.clock;
            for entity in self.entities_mut() {
                clock.advance(&mut entity.track, delta_seconds);
            }
        }

        match self.rig.compute_camera(&self.primaries, &self.selection) {
            Ok(pose) => self.camera = Some(pose),
            Err(e) => trace!(error = %e, "camera pose unchanged"),
        }

        self.snapshot()
    }

    /// Current visual state without advancing.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            generation: self.generation,
            replay_time: self.reference_track_entity().track.elapsed(),
            paused: self.paused,
            progress: self.progress(),
            camera: self.camera,
            entities: self.entities().map(EntityFrame::from).collect(),
        }
    }

    /// Applies a model load result. Returns false when the slot is unknown or
    /// its model already resolved.
    pub fn apply_model(
        &mut self,
        slot: EntitySlot,
        result: std::result::Result<ModelHandle, EnvError>,
    ) -> bool {
        match self.entity_mut(slot) {
            Some(entity) => entity.resolve_model(result),
            None => {
                debug!(slot = %slot, "model completion for an entity not in this replay");
                false
            }
        }
    }

    /// Restarts every track from its first sample.
    pub fn reset(&mut self) {
        let clock = self.clock;
        clock.reset_all(self.entities_mut().map(|e| &mut e.track));
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Follows `role`; the look entity is re-derived.
    pub fn follow(&mut self, role: Role) {
        debug!(follow = %role, look = %role.derived_look(), "camera follow changed");
        self.selection.set_follow(role);
    }

    /// Looks at `role` until the next follow change.
    pub fn look_at(&mut self, role: Role) {
        self.selection.set_look(role);
    }

    pub fn selection(&self) -> &CameraSelection {
        &self.selection
    }

    /// Last computed camera pose.
    pub fn camera(&self) -> Option<&CameraPose> {
        self.camera.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn impact_id(&self) -> i64 {
        self.impact_id
    }

    /// Weapon-to-target distance at impact, when the payload carries one.
    pub fn impact_distance(&self) -> Option<f64> {
        self.impact_distance
    }

    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    /// Point on the ground plane under the target's final position.
    pub fn ground_anchor(&self) -> Vector3<f64> {
        self.ground_anchor
    }

    pub fn primaries(&self) -> &PrimaryTracks {
        &self.primaries
    }

    pub fn bystanders(&self) -> &[Entity] {
        &self.bystanders
    }

    /// Playback progress of the killer, or of the target without a killer.
    pub fn progress(&self) -> f64 {
        self.reference_track_entity().track.progress()
    }

    /// Number of entities still waiting for their model.
    pub fn pending_models(&self) -> usize {
        self.entities().filter(|e| e.model().is_pending()).count()
    }

    pub fn entity(&self, slot: EntitySlot) -> Option<&Entity> {
        match slot {
            EntitySlot::Primary(role) => self.primaries.get(role),
            EntitySlot::Bystander(_) => self.bystanders.iter().find(|e| e.slot == slot),
        }
    }

    pub fn entity_mut(&mut self, slot: EntitySlot) -> Option<&mut Entity> {
        match slot {
            EntitySlot::Primary(role) => self.primaries.get_mut(role),
            EntitySlot::Bystander(_) => self.bystanders.iter_mut().find(|e| e.slot == slot),
        }
    }

    /// Every present entity: primaries in role order, then bystanders.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.primaries.iter().chain(self.bystanders.iter())
    }

    fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.primaries.iter_mut().chain(self.bystanders.iter_mut())
    }

    fn reference_track_entity(&self) -> &Entity {
        self.primaries.killer.as_ref().unwrap_or(&self.primaries.target)
    }
}

/// Keeps an optional entity, logging why it was dropped.
fn degrade(result: Result<Entity>) -> Option<Entity> {
    match result {
        Ok(entity) => Some(entity),
        Err(e) => {
            warn!(error = %e, "entity omitted from replay");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::KillcamError;
    use approx::assert_relative_eq;

    fn record(name: &str, cat: &str, coords: &[[f64; 3]], times: &[f64]) -> EntityRecord {
        EntityRecord {
            id: None,
            name: name.to_string(),
            kind: "F-16C".to_string(),
            cat: cat.to_string(),
            color: "Blue".to_string(),
            coord: coords.to_vec(),
            rot: vec![[0.0; 3]; coords.len()],
            time_step: times.to_vec(),
            heading: None,
        }
    }

    /// Killer flies straight at a stationary target; the weapon leaves
    /// with it and arrives just before the end.
    pub(crate) fn straight_kill() -> KillPayload {
        let path = [[0.0, 0.0, 0.0], [0.0, 0.0, 500.0], [0.0, 0.0, 1000.0]];
        KillPayload {
            impact_id: 1,
            impact_dist: crate::payload::ImpactDistance::Label("3.21m".to_string()),
            min_ts: 0.0,
            max_ts: 10.0,
            killer: record("Viper 1-1", "Air+FixedWing", &path, &[0.0, 5.0, 10.0]),
            weapon: record("AIM-120C", "Weapon+Missile", &path, &[0.0, 5.0, 9.9]),
            target: record("MiG-29", "Air+FixedWing", &[[0.0, 0.0, 1500.0]; 3], &[0.0, 5.0, 10.0]),
            other: Vec::new(),
        }
    }

    fn ready_all(context: &mut ReplayContext, tickets: &[ModelTicket]) {
        for ticket in tickets {
            let handle = ModelHandle::new(ticket.request.asset.clone(), 64);
            assert!(context.apply_model(ticket.slot, Ok(handle)));
        }
    }

    #[test]
    fn test_end_to_end_straight_kill() {
        let (mut context, tickets) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();

        assert_eq!(tickets.len(), 3);
        assert!(tickets.iter().all(|t| t.generation == Generation(1)));

        let killer = &context.primaries().killer.as_ref().unwrap().track;
        assert_eq!(killer.len(), 9);
        assert_eq!(killer.time_steps()[0], 0.0);
        assert_relative_eq!(killer.time_steps()[8], 10.0, epsilon = 1e-9);
        assert_eq!(killer.max_time(), 10.0);

        // Models still loading: nothing drawn, no camera
        let frame = context.step(0.0);
        assert!(frame.camera.is_none());
        assert_eq!(frame.drawable_count(), 0);

        ready_all(&mut context, &tickets);
        let frame = context.step(0.0);
        let pose = frame.camera.unwrap();
        assert_relative_eq!(pose.position, Vector3::new(0.0, 200.0, -1000.0), epsilon = 1e-9);
        assert_relative_eq!(pose.look_at, Vector3::new(0.0, 0.0, 200.0), epsilon = 1e-9);

        let frame = context.step(10.0);
        let killer_frame = frame.entity(Role::Killer.into()).unwrap();
        assert_eq!(killer_frame.cursor_index, 8);
        assert!(killer_frame.drawable);
        assert_relative_eq!(killer_frame.position.z, 1000.0, epsilon = 1e-6);

        let frame = context.step(0.01);
        let killer_frame = frame.entity(Role::Killer.into()).unwrap();
        assert_eq!(killer_frame.cursor_index, 0);
        assert_eq!(killer_frame.reveal_length, 0);
        assert_eq!(frame.replay_time, 0.0);
    }

    #[test]
    fn test_munition_style_and_ground_anchor() {
        let (context, tickets) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();

        let weapon = tickets
            .iter()
            .find(|t| t.slot == EntitySlot::Primary(Role::Weapon))
            .unwrap();
        assert_eq!(weapon.request.asset, "/static/mesh/Missile.AIM-120C.obj");
        assert_eq!(weapon.request.tint, "blue");

        let style = &context.primaries().weapon.as_ref().unwrap().style;
        assert_relative_eq!(style.ribbon_width, 4.0);
        assert_relative_eq!(style.opacity, 1.0);

        assert_relative_eq!(context.ground_anchor(), Vector3::new(0.0, 0.0, 1500.0), epsilon = 1e-9);
        assert_relative_eq!(context.impact_distance().unwrap(), 3.21);
    }

    #[test]
    fn test_short_target_fails_load() {
        let mut payload = straight_kill();
        payload.target = record("MiG-29", "Air+FixedWing", &[[0.0, 0.0, 1500.0]], &[0.0]);

        let err = ReplayContext::load(&payload, &KillcamConfig::default(), Generation(1)).unwrap_err();
        match err {
            KillcamError::InsufficientSamples { entity, count } => {
                assert_eq!(entity, "target");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_bystander_is_omitted() {
        let mut payload = straight_kill();
        payload.other.push(record("Eagle 2", "Air+FixedWing", &[[9.0, 9.0, 9.0]], &[1.0]));
        payload.other.push(record(
            "Eagle 3",
            "Air+FixedWing",
            &[[0.0, 100.0, 0.0], [50.0, 100.0, 0.0]],
            &[0.0, 10.0],
        ));

        let (context, tickets) =
            ReplayContext::load(&payload, &KillcamConfig::default(), Generation(1)).unwrap();
        assert_eq!(tickets.len(), 4);
        assert_eq!(context.bystanders().len(), 1);

        // Ids stay stable even when an earlier bystander is dropped
        let slot = EntitySlot::Bystander(BystanderId(1));
        assert_eq!(context.entity(slot).unwrap().name, "Eagle 3");
        assert!(context.entity(EntitySlot::Bystander(BystanderId(0))).is_none());
    }

    #[test]
    fn test_short_killer_is_omitted() {
        let mut payload = straight_kill();
        payload.killer = record("Viper 1-1", "Air+FixedWing", &[[0.0, 0.0, 0.0]], &[0.0]);

        let (mut context, tickets) =
            ReplayContext::load(&payload, &KillcamConfig::default(), Generation(1)).unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(context.primaries().killer.is_none());

        ready_all(&mut context, &tickets);
        // Following the absent killer keeps the camera unset
        assert!(context.step(0.5).camera.is_none());

        context.follow(Role::Weapon);
        assert!(context.step(0.5).camera.is_some());
    }

    #[test]
    fn test_pause_freezes_tracks_not_camera() {
        let (mut context, tickets) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();
        ready_all(&mut context, &tickets);

        context.step(3.0);
        context.set_paused(true);
        let frame = context.step(4.0);
        assert!(frame.paused);
        assert_eq!(frame.entity(Role::Killer.into()).unwrap().cursor_index, 2);
        assert!(frame.camera.is_some());

        assert!(!context.toggle_pause());
        let frame = context.step(4.0);
        assert_eq!(frame.entity(Role::Killer.into()).unwrap().cursor_index, 5);
    }

    #[test]
    fn test_follow_switch_is_instant() {
        let (mut context, tickets) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();
        ready_all(&mut context, &tickets);
        context.step(0.0);

        context.follow(Role::Target);
        assert_eq!(context.selection().look(), Role::Killer);
        let pose = context.step(0.0).camera.unwrap();
        // Behind the target, looking back toward the killer
        assert_relative_eq!(pose.position, Vector3::new(0.0, 200.0, 2500.0), epsilon = 1e-9);

        context.look_at(Role::Weapon);
        assert_eq!(context.selection().look(), Role::Weapon);
        context.follow(Role::Killer);
        assert_eq!(context.selection().look(), Role::Target);
    }

    #[test]
    fn test_duplicate_model_completion_ignored() {
        let (mut context, _) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();
        let slot = Role::Target.into();
        assert!(context.apply_model(slot, Err(EnvError::load_failed("bad mesh"))));
        assert!(!context.apply_model(slot, Ok(ModelHandle::new("/mesh/a.obj", 1))));
        assert!(!context.entity(slot).unwrap().is_model_ready());
        assert_eq!(context.pending_models(), 2);
    }

    #[test]
    fn test_reset_restarts_tracks() {
        let (mut context, _) =
            ReplayContext::load(&straight_kill(), &KillcamConfig::default(), Generation(1)).unwrap();
        context.step(6.0);
        context.reset();
        assert!(context.entities().all(|e| e.track.cursor_index() == 0));
        assert_eq!(context.progress(), 0.0);
    }
}
