//! Rerun visualization for replay runs.
//!
//! Visualization is optional and only available with the `visualization` feature.
//!
//! # What Gets Logged
//!
//! - Entity positions per slot, drawable ones bright, hidden ones dim
//! - The camera position and its line of sight
//! - Harness events (loads, teardowns, control changes) as text
//! - Replay progress as a scalar

use killcam_core::frame::FrameSnapshot;

#[cfg(feature = "visualization")]
use rerun::{Color, LineStrips3D, Points3D, Position3D, Radius, RecordingStream};

/// Rerun logger for replay visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to watch the replay");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs one rendered frame.
    #[cfg(feature = "visualization")]
    pub fn log_frame(&self, frame: &FrameSnapshot) {
        let Some(ref rec) = self.rec else {
            return;
        };
        rec.set_time_seconds("replay_time", frame.replay_time);

        for entity in &frame.entities {
            let p = entity.position;
            let color = if entity.drawable {
                Color::from_rgb(255, 140, 0)
            } else {
                Color::from_rgb(90, 90, 90)
            };
            let _ = rec.log(
                format!("world/entities/{}", entity.slot),
                &Points3D::new([Position3D::new(p.x as f32, p.y as f32, p.z as f32)])
                    .with_colors([color])
                    .with_radii([Radius::new_scene_units(8.0)]),
            );
        }

        if let Some(camera) = &frame.camera {
            let from = [camera.position.x as f32, camera.position.y as f32, camera.position.z as f32];
            let to = [camera.look_at.x as f32, camera.look_at.y as f32, camera.look_at.z as f32];
            let _ = rec.log(
                "world/camera",
                &LineStrips3D::new([[from, to]]).with_colors([Color::from_rgb(100, 100, 255)]),
            );
        }

        let _ = rec.log("metrics/progress", &rerun::Scalar::new(frame.progress));
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_frame(&self, _frame: &FrameSnapshot) {}

    /// Logs a text annotation (e.g., teardown).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}
}
