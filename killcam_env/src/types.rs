//! Common types for the killcam environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to load one entity's visual model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Asset path, e.g. `/static/mesh/FixedWing.F-18C.obj`
    pub asset: String,
    
    /// Uniform scale applied to the loaded model
    pub scale: f64,
    
    /// Material color (lower-cased CSS-style name or hex)
    pub tint: String,
}

impl ModelRequest {
    /// Creates a new request.
    pub fn new(asset: impl Into<String>, scale: f64, tint: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            scale,
            tint: tint.into(),
        }
    }
}

/// Handle to a loaded model.
///
/// Opaque to the engine - it only records that the model exists so the
/// entity can be drawn and the camera can follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHandle {
    /// Unique handle id
    pub id: Uuid,
    
    /// Asset the handle was loaded from
    pub asset: String,
    
    /// Size of the loaded asset in bytes
    pub byte_len: usize,
}

impl ModelHandle {
    /// Creates a handle with a fresh random id.
    pub fn new(asset: impl Into<String>, byte_len: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset: asset.into(),
            byte_len,
        }
    }
    
    /// Creates a handle with a caller-chosen id (deterministic in simulation).
    pub fn with_id(id: Uuid, asset: impl Into<String>, byte_len: usize) -> Self {
        Self {
            id,
            asset: asset.into(),
            byte_len,
        }
    }
}

impl std::fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}@{}", &self.id.to_string()[..8], self.asset)
    }
}
