//! Engine configuration.
//!
//! Every tunable constant of the engine lives here. All sections default to
//! the values the killcam has always used, so an empty config file is valid.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{KillcamError, Result};
use crate::spline::CurveType;
use crate::types::{Category, Role};

/// Track Builder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackParams {
    /// Dense points per raw sample (default: 3)
    pub oversample: usize,

    /// Distance of each look point from its curve point (default: 10.0)
    pub lookahead_distance: f64,

    /// Catmull-Rom parameterization (default: centripetal)
    pub curve_type: CurveType,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            oversample: 3,
            lookahead_distance: 10.0,
            curve_type: CurveType::Centripetal,
        }
    }
}

impl TrackParams {
    /// Rejects parameters the Track Builder cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.oversample == 0 {
            return Err(KillcamError::invalid_config("oversample must be at least 1"));
        }
        if !(self.lookahead_distance.is_finite() && self.lookahead_distance > 0.0) {
            return Err(KillcamError::invalid_config(format!(
                "lookahead_distance must be positive, got {}",
                self.lookahead_distance
            )));
        }
        Ok(())
    }
}

/// Playback Clock parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Trailing-ribbon vertices exposed per curve-point step (default: 6)
    pub reveal_stride: usize,

    /// Frame rate used by drivers that schedule their own frames (default: 60)
    pub frame_rate_hz: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reveal_stride: 6,
            frame_rate_hz: 60,
        }
    }
}

impl PlaybackConfig {
    /// Interval between frames at `frame_rate_hz`.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// Camera Rig parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Distance behind the follow entity (default: 1000)
    pub back_distance: f64,

    /// Height above the follow entity along world up (default: 200)
    pub altitude: f64,

    /// Distance of the look-at point ahead of the follow entity (default: 200)
    pub look_ahead: f64,

    /// Direction used when follow and look positions coincide
    pub fallback_direction: Vector3<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            back_distance: 1000.0,
            altitude: 200.0,
            look_ahead: 200.0,
            fallback_direction: Vector3::x(),
        }
    }
}

impl CameraConfig {
    /// Rejects non-finite distances and an unusable fallback direction.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("back_distance", self.back_distance),
            ("altitude", self.altitude),
            ("look_ahead", self.look_ahead),
        ] {
            if !value.is_finite() {
                return Err(KillcamError::invalid_config(format!(
                    "camera.{} must be finite, got {}",
                    name, value
                )));
            }
        }
        if !self.fallback_direction.iter().all(|c| c.is_finite()) {
            return Err(KillcamError::invalid_config("fallback_direction must be finite"));
        }
        if self.fallback_direction.norm() < f64::EPSILON {
            return Err(KillcamError::invalid_config("fallback_direction must be non-zero"));
        }
        Ok(())
    }
}

/// Visual style parameters, split by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    pub ribbon_width: f64,
    pub munition_ribbon_width: f64,
    pub opacity: f64,
    pub munition_opacity: f64,
    pub model_scale: f64,
    pub aircraft_model: String,
    pub munition_model: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            ribbon_width: 15.0,
            munition_ribbon_width: (15.0_f64 / 4.0).round(),
            opacity: 0.7,
            munition_opacity: 1.0,
            model_scale: 8.0,
            aircraft_model: "/static/mesh/FixedWing.F-18C.obj".to_string(),
            munition_model: "/static/mesh/Missile.AIM-120C.obj".to_string(),
        }
    }
}

/// Resolved look of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualStyle {
    pub ribbon_width: f64,
    pub opacity: f64,
    pub model_scale: f64,
    pub model_asset: String,
    pub color: String,
}

impl StyleConfig {
    /// Resolves the style for an entity of `category` drawn in `color`.
    pub fn resolve(&self, category: Category, color: &str) -> VisualStyle {
        let (ribbon_width, opacity, model_asset) = match category {
            Category::Munition => (
                self.munition_ribbon_width,
                self.munition_opacity,
                &self.munition_model,
            ),
            Category::Aircraft | Category::Other => {
                (self.ribbon_width, self.opacity, &self.aircraft_model)
            }
        };
        VisualStyle {
            ribbon_width,
            opacity,
            model_scale: self.model_scale,
            model_asset: model_asset.clone(),
            color: color.to_lowercase(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KillcamConfig {
    pub track: TrackParams,
    pub playback: PlaybackConfig,
    pub camera: CameraConfig,
    pub style: StyleConfig,

    /// Role the camera follows when a replay loads (default: killer)
    pub follow: FollowDefault,
}

/// Serializable wrapper so `follow` defaults to the killer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FollowDefault(pub Role);

impl Default for FollowDefault {
    fn default() -> Self {
        FollowDefault(Role::Killer)
    }
}

impl KillcamConfig {
    /// Parses a TOML config.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| KillcamError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            KillcamError::invalid_config(format!("failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.track.validate()?;
        if self.playback.reveal_stride == 0 {
            return Err(KillcamError::invalid_config("reveal_stride must be at least 1"));
        }
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = KillcamConfig::default();
        assert_eq!(config.track.oversample, 3);
        assert_eq!(config.playback.reveal_stride, 6);
        assert_relative_eq!(config.camera.back_distance, 1000.0);
        assert_relative_eq!(config.camera.altitude, 200.0);
        assert_relative_eq!(config.camera.look_ahead, 200.0);
        assert_eq!(config.follow.0, Role::Killer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = KillcamConfig::from_toml_str("").unwrap();
        assert_eq!(config.track.oversample, 3);
        assert_eq!(config.style.munition_model, "/static/mesh/Missile.AIM-120C.obj");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let text = r#"
            follow = "weapon"

            [track]
            oversample = 5
            curve_type = "uniform"

            [camera]
            back_distance = 600.0
        "#;
        let config = KillcamConfig::from_toml_str(text).unwrap();
        assert_eq!(config.track.oversample, 5);
        assert_eq!(config.track.curve_type, CurveType::Uniform);
        assert_relative_eq!(config.track.lookahead_distance, 10.0);
        assert_relative_eq!(config.camera.back_distance, 600.0);
        assert_relative_eq!(config.camera.altitude, 200.0);
        assert_eq!(config.follow.0, Role::Weapon);
    }

    #[test]
    fn test_zero_oversample_rejected() {
        let err = KillcamConfig::from_toml_str("[track]\noversample = 0\n").unwrap_err();
        assert!(matches!(err, KillcamError::InvalidConfig(_)));
    }

    #[test]
    fn test_non_finite_camera_rejected() {
        for text in [
            "[camera]\nfallback_direction = [nan, 0.0, 0.0]\n",
            "[camera]\nback_distance = nan\n",
            "[camera]\naltitude = inf\n",
            "[camera]\nfallback_direction = [0.0, 0.0, 0.0]\n",
        ] {
            let err = KillcamConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, KillcamError::InvalidConfig(_)), "{}", text);
        }

        let mut camera = CameraConfig::default();
        camera.look_ahead = f64::NAN;
        assert!(camera.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = KillcamConfig::from_toml_str("[camera]\nback_distanc = 600.0\n").unwrap_err();
        assert!(matches!(err, KillcamError::InvalidConfig(_)));

        let err = KillcamConfig::from_json_str(r#"{"playbak": {}}"#).unwrap_err();
        assert!(matches!(err, KillcamError::InvalidConfig(_)));
    }

    #[test]
    fn test_json_config() {
        let config = KillcamConfig::from_json_str(r#"{"playback": {"reveal_stride": 4}}"#).unwrap();
        assert_eq!(config.playback.reveal_stride, 4);
    }

    #[test]
    fn test_style_by_category() {
        let style = StyleConfig::default();

        let missile = style.resolve(Category::Munition, "Black");
        assert_relative_eq!(missile.ribbon_width, 4.0);
        assert_relative_eq!(missile.opacity, 1.0);
        assert_eq!(missile.model_asset, "/static/mesh/Missile.AIM-120C.obj");
        assert_eq!(missile.color, "black");

        let jet = style.resolve(Category::Aircraft, "Red");
        assert_relative_eq!(jet.ribbon_width, 15.0);
        assert_relative_eq!(jet.opacity, 0.7);
        assert_eq!(jet.model_asset, "/static/mesh/FixedWing.F-18C.obj");
    }
}
