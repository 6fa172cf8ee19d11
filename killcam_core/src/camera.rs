//! The Camera Rig.
//!
//! A chase camera placed behind and above the follow entity, looking past it
//! toward the look entity. The rig has no state of its own: the pose is a pure
//! function of two live positions, so follow/look switches are instant cuts.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::entity::{Entity, PrimaryTracks};
use crate::error::{KillcamError, Result};
use crate::types::Role;

/// Where the camera is and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
    pub up: Vector3<f64>,
}

/// Which entity the camera follows and which it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSelection {
    follow: Role,
    look_override: Option<Role>,
}

impl CameraSelection {
    /// Follows `role` and looks where the derivation table says.
    pub fn new(follow: Role) -> Self {
        Self {
            follow,
            look_override: None,
        }
    }

    pub fn follow(&self) -> Role {
        self.follow
    }

    /// The explicit look role, else the one derived from the follow role.
    pub fn look(&self) -> Role {
        self.look_override.unwrap_or_else(|| self.follow.derived_look())
    }

    /// Switches the follow entity and drops any look override.
    pub fn set_follow(&mut self, role: Role) {
        self.follow = role;
        self.look_override = None;
    }

    /// Overrides the look entity until the next follow change.
    pub fn set_look(&mut self, role: Role) {
        self.look_override = Some(role);
    }
}

impl Default for CameraSelection {
    fn default() -> Self {
        Self::new(Role::Killer)
    }
}

/// Computes chase-camera poses.
#[derive(Debug, Clone)]
pub struct CameraRig {
    config: CameraConfig,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Pose for a camera following `follow` while facing `look`.
    ///
    /// ```text
    ///   position = follow - dir * back_distance + up * altitude
    ///   look_at  = follow + dir * look_ahead
    /// ```
    /// with `dir` the unit vector from `follow` toward `look`.
    pub fn compute(&self, follow: Vector3<f64>, look: Vector3<f64>) -> CameraPose {
        let up = Vector3::y();
        let dir = (look - follow)
            .try_normalize(f64::EPSILON)
            .or_else(|| self.config.fallback_direction.try_normalize(f64::EPSILON))
            .unwrap_or_else(Vector3::x);

        CameraPose {
            position: follow - dir * self.config.back_distance + up * self.config.altitude,
            look_at: follow + dir * self.config.look_ahead,
            up,
        }
    }

    /// Pose from the live positions of the selected entities.
    ///
    /// Fails with `PendingAsset` while either entity is missing or its model
    /// is still loading; the caller keeps its previous pose.
    pub fn compute_camera(
        &self,
        tracks: &PrimaryTracks,
        selection: &CameraSelection,
    ) -> Result<CameraPose> {
        let follow = ready(tracks, selection.follow())?;
        let look = ready(tracks, selection.look())?;
        Ok(self.compute(follow.track.position(), look.track.position()))
    }
}

fn ready(tracks: &PrimaryTracks, role: Role) -> Result<&Entity> {
    tracks
        .get(role)
        .filter(|e| e.is_model_ready())
        .ok_or(KillcamError::PendingAsset(role.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::entity;
    use approx::assert_relative_eq;
    use killcam_env::ModelHandle;

    fn rig() -> CameraRig {
        CameraRig::new(CameraConfig::default())
    }

    #[test]
    fn test_compute_pose() {
        let pose = rig().compute(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1500.0));
        assert_relative_eq!(pose.position, Vector3::new(0.0, 200.0, -1000.0), epsilon = 1e-9);
        assert_relative_eq!(pose.look_at, Vector3::new(0.0, 0.0, 200.0), epsilon = 1e-9);
        assert_eq!(pose.up, Vector3::y());
    }

    #[test]
    fn test_coincident_positions_use_fallback() {
        let p = Vector3::new(5.0, 5.0, 5.0);
        let pose = rig().compute(p, p);
        assert!(pose.position.iter().all(|v| v.is_finite()));
        assert_relative_eq!(pose.look_at, Vector3::new(205.0, 5.0, 5.0), epsilon = 1e-9);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let a = Vector3::new(12.0, -3.0, 400.0);
        let b = Vector3::new(-80.0, 20.0, 1.0);
        assert_eq!(rig().compute(a, b), rig().compute(a, b));
    }

    #[test]
    fn test_selection_derivation() {
        let mut selection = CameraSelection::new(Role::Weapon);
        assert_eq!(selection.look(), Role::Target);

        selection.set_follow(Role::Target);
        assert_eq!(selection.look(), Role::Killer);

        selection.set_look(Role::Weapon);
        assert_eq!(selection.look(), Role::Weapon);

        // A follow change clears the override
        selection.set_follow(Role::Killer);
        assert_eq!(selection.look(), Role::Target);
    }

    #[test]
    fn test_compute_camera_waits_for_models() {
        let mut tracks = PrimaryTracks {
            killer: Some(entity(Role::Killer.into(), Vector3::zeros(), Vector3::new(0.0, 0.0, 1000.0))),
            weapon: None,
            target: entity(
                Role::Target.into(),
                Vector3::new(0.0, 0.0, 1500.0),
                Vector3::new(0.0, 0.0, 1500.0),
            ),
        };
        let selection = CameraSelection::new(Role::Killer);

        let err = rig().compute_camera(&tracks, &selection).unwrap_err();
        assert!(matches!(err, KillcamError::PendingAsset(_)));

        for e in tracks.iter_mut() {
            e.resolve_model(Ok(ModelHandle::new("/mesh/a.obj", 1)));
        }
        let pose = rig().compute_camera(&tracks, &selection).unwrap();
        assert_relative_eq!(pose.position, Vector3::new(0.0, 200.0, -1000.0), epsilon = 1e-9);

        // Weapon is absent
        let weapon_cam = CameraSelection::new(Role::Weapon);
        assert!(matches!(
            rig().compute_camera(&tracks, &weapon_cam),
            Err(KillcamError::PendingAsset(_))
        ));
    }
}
