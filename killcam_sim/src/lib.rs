//! Killcam Deterministic Simulation Harness
//!
//! Runs the replay engine end to end without a window, a network or a
//! wall clock:
//! - **Time**: a virtual clock that moves only when the frame loop sleeps
//! - **Assets**: a model loader with seeded latency and injected failures
//! - **Data**: kill payloads generated from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ current-thread Tokio runtime + SimContext clock      │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │ payload                      ▲ LoadEvent            │
//! │  ┌────▼─────────┐   ModelRequest  ┌──┴─────────────┐        │
//! │  │ ReplayDriver │ ──────────────▶ │ SimModelLoader │        │
//! │  └──────────────┘                 └────────────────┘        │
//! │       │ FrameSnapshot                                       │
//! │  ┌────▼──────────────────────────────┐                      │
//! │  │ FrameRecorder (invariant checks)  │──▶ export / Rerun    │
//! │  └───────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use killcam_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::LateModels);
//! assert!(result.passed);
//! ```

mod context;
pub mod exporter;
pub mod fixtures;
mod loader;
pub mod runner;
pub mod scenarios;
pub mod visualizer;

pub use context::SimContext;
pub use exporter::{EntityPosition, ExportFrame, ReplayExport, SimEvent};
pub use fixtures::{straight_shot, KillGenerator};
pub use loader::{LatencyModel, SimModelLoader};
pub use runner::{FrameRecorder, ScenarioError, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use visualizer::RerunLogger;
