//! Loaded entities and their model state.

use killcam_env::{EnvError, ModelHandle, ModelRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::VisualStyle;
use crate::track::Track;
use crate::types::{Category, EntitySlot, Role};

/// Load state of an entity's model.
///
/// Leaves `Pending` exactly once; later completions are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelState {
    Pending,
    Ready(ModelHandle),
    Failed(String),
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ModelState::Pending)
    }
}

/// One participant of a replay: its track, its look and its model.
#[derive(Debug, Clone)]
pub struct Entity {
    pub slot: EntitySlot,
    pub name: String,
    pub kind: String,
    pub category: Category,
    pub style: VisualStyle,
    pub track: Track,
    model: ModelState,
}

impl Entity {
    pub fn new(
        slot: EntitySlot,
        name: impl Into<String>,
        kind: impl Into<String>,
        category: Category,
        style: VisualStyle,
        track: Track,
    ) -> Self {
        Self {
            slot,
            name: name.into(),
            kind: kind.into(),
            category,
            style,
            track,
            model: ModelState::Pending,
        }
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn is_model_ready(&self) -> bool {
        self.model.is_ready()
    }

    /// Drawn this frame: model loaded and track started.
    pub fn is_drawable(&self) -> bool {
        self.model.is_ready() && self.track.is_visible()
    }

    /// The request handed to the model loader for this entity.
    pub fn model_request(&self) -> ModelRequest {
        ModelRequest::new(
            self.style.model_asset.clone(),
            self.style.model_scale,
            self.style.color.clone(),
        )
    }

    /// Applies a load completion. Returns false if the model already resolved.
    pub fn resolve_model(&mut self, result: Result<ModelHandle, EnvError>) -> bool {
        if !self.model.is_pending() {
            debug!(slot = %self.slot, "ignoring duplicate model completion");
            return false;
        }

        self.model = match result {
            Ok(handle) => {
                debug!(slot = %self.slot, model = %handle, "model ready");
                ModelState::Ready(handle)
            }
            Err(e) => {
                warn!(slot = %self.slot, error = %e, "model failed to load, entity stays hidden");
                ModelState::Failed(e.to_string())
            }
        };
        true
    }
}

/// The primary participants. Target is always present; killer and weapon
/// may be omitted when their data was unusable.
#[derive(Debug, Clone)]
pub struct PrimaryTracks {
    pub killer: Option<Entity>,
    pub weapon: Option<Entity>,
    pub target: Entity,
}

impl PrimaryTracks {
    pub fn get(&self, role: Role) -> Option<&Entity> {
        match role {
            Role::Killer => self.killer.as_ref(),
            Role::Weapon => self.weapon.as_ref(),
            Role::Target => Some(&self.target),
        }
    }

    pub fn get_mut(&mut self, role: Role) -> Option<&mut Entity> {
        match role {
            Role::Killer => self.killer.as_mut(),
            Role::Weapon => self.weapon.as_mut(),
            Role::Target => Some(&mut self.target),
        }
    }

    /// Present entities in role order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.killer
            .iter()
            .chain(self.weapon.iter())
            .chain(std::iter::once(&self.target))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.killer
            .iter_mut()
            .chain(self.weapon.iter_mut())
            .chain(std::iter::once(&mut self.target))
    }
}
