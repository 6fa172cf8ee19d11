//! Per-frame output handed to the renderer.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::CameraPose;
use crate::entity::Entity;
use crate::types::{EntitySlot, Generation};

/// Visual state of one entity for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFrame {
    pub slot: EntitySlot,
    pub name: String,
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub cursor_index: usize,
    pub reveal_length: usize,
    pub visible: bool,
    pub model_ready: bool,
    /// Model loaded and track visible
    pub drawable: bool,
}

impl From<&Entity> for EntityFrame {
    fn from(entity: &Entity) -> Self {
        let track = &entity.track;
        Self {
            slot: entity.slot,
            name: entity.name.clone(),
            position: track.position(),
            look_at: track.look_point(),
            orientation: track.orientation(),
            cursor_index: track.cursor_index(),
            reveal_length: track.reveal_length(),
            visible: track.is_visible(),
            model_ready: entity.is_model_ready(),
            drawable: entity.is_drawable(),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub generation: Generation,

    /// Elapsed replay seconds of the reference track
    pub replay_time: f64,

    pub paused: bool,

    /// Playback progress in `[0, 1)`
    pub progress: f64,

    /// Absent until both camera entities have their models
    pub camera: Option<CameraPose>,

    pub entities: Vec<EntityFrame>,
}

impl FrameSnapshot {
    pub fn entity(&self, slot: EntitySlot) -> Option<&EntityFrame> {
        self.entities.iter().find(|e| e.slot == slot)
    }

    /// Number of entities drawn this frame.
    pub fn drawable_count(&self) -> usize {
        self.entities.iter().filter(|e| e.drawable).count()
    }
}
