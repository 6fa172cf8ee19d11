//! Killcam Core - 3D kill replay engine
//!
//! Reconstructs smooth flight paths from sparse recorded samples and plays
//! them back under a chase camera:
//! 1. **Track Builder**: Catmull-Rom curve, look points and a monotone time index per entity
//! 2. **Playback Clock**: per-frame cursor advance with loop wraparound
//! 3. **Camera Rig**: follow/look chase camera with a role derivation table
//!
//! Model loading is the only asynchronous part. Completions come back as
//! messages tagged with a generation, so a torn-down replay can never be
//! touched by a late load.

pub mod camera;
pub mod config;
pub mod driver;
pub mod entity;
pub mod error;
pub mod frame;
pub mod payload;
pub mod playback;
pub mod replay;
pub mod session;
pub mod spline;
pub mod track;
pub mod types;

// Re-export key types for convenience
pub use camera::{CameraPose, CameraRig, CameraSelection};
pub use config::{KillcamConfig, TrackParams, VisualStyle};
pub use driver::{FrameSink, ReplayDriver};
pub use entity::{Entity, ModelState, PrimaryTracks};
pub use error::{KillcamError, Result};
pub use frame::{EntityFrame, FrameSnapshot};
pub use payload::{EntityRecord, KillPayload};
pub use playback::{Advance, FrameClock, PlaybackClock};
pub use replay::{ModelTicket, ReplayContext};
pub use session::{FrameToken, LoadEvent, ReplaySession, SessionStats};
pub use spline::CurveType;
pub use track::{build_entity_track, build_track, Track};
pub use types::{BystanderId, Category, EntitySlot, Generation, Role, Sample};
