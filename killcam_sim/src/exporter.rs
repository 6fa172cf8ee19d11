//! JSON exporter for replay runs.
//!
//! Exports rendered frames as JSON so a run can be inspected or plotted
//! outside the harness.

use killcam_core::camera::CameraPose;
use killcam_core::driver::FrameSink;
use killcam_core::frame::FrameSnapshot;
use killcam_core::session::SessionStats;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single exported frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFrame {
    /// Frame number within the run
    pub index: u64,

    /// Replay time in seconds
    pub replay_time: f64,

    pub paused: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraPose>,

    pub entities: Vec<EntityPosition>,

    /// Events (loads, teardowns, control changes)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Position of an entity in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPosition {
    pub slot: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub cursor: usize,
    pub drawable: bool,
}

impl EntityPosition {
    pub fn new(slot: impl Into<String>, pos: Vector3<f64>, cursor: usize, drawable: bool) -> Self {
        Self {
            slot: slot.into(),
            x: pos.x,
            y: pos.y,
            z: pos.z,
            cursor,
            drawable,
        }
    }
}

/// Harness event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Replay time covered, in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<ExportFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,

    /// Events not yet attached to a frame
    #[serde(skip)]
    pending_events: Vec<SimEvent>,
}

impl ReplayExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            stats: None,
            pending_events: Vec::new(),
        }
    }

    /// Queues an event for the next frame.
    pub fn event(&mut self, event: SimEvent) {
        self.pending_events.push(event);
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: &FrameSnapshot) {
        self.duration_sec = self.duration_sec.max(frame.replay_time);
        self.frames.push(ExportFrame {
            index: self.frames.len() as u64,
            replay_time: frame.replay_time,
            paused: frame.paused,
            camera: frame.camera,
            entities: frame
                .entities
                .iter()
                .map(|e| EntityPosition::new(e.slot.to_string(), e.position, e.cursor_index, e.drawable))
                .collect(),
            events: std::mem::take(&mut self.pending_events),
        });
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, stats: SessionStats) {
        self.passed = passed;
        self.stats = Some(stats);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl FrameSink for ReplayExport {
    fn present(&mut self, frame: &FrameSnapshot) {
        self.add_frame(frame);
    }
}
