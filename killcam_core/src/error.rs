//! Error taxonomy for the killcam engine.

use thiserror::Error;

use crate::types::{EntitySlot, Generation};

/// Errors produced while loading and playing a replay.
///
/// `PendingAsset` and `StaleCallback` describe normal transient states; they
/// are values so callers can match on them, and the frame loop treats them
/// as "skip", never as a failure.
#[derive(Debug, Error)]
pub enum KillcamError {
    /// An entity has too few samples to fit a curve through
    #[error("entity '{entity}' has {count} samples, at least 2 are required")]
    InsufficientSamples { entity: String, count: usize },

    /// An entity's model has not finished loading (or the entity is absent)
    #[error("model for {0} is not ready")]
    PendingAsset(EntitySlot),

    /// A load completion arrived for a replay that was already torn down
    #[error("load completion for generation {received} is stale (current: {current})")]
    StaleCallback {
        received: Generation,
        current: Generation,
    },

    /// Retrieval returned data missing fields or with inconsistent arrays
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Track parameters or a config file are unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A control was used while no replay is loaded
    #[error("no replay is loaded")]
    NotLoaded,
}

impl KillcamError {
    /// Creates a malformed-payload error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Creates an invalid-config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<serde_json::Error> for KillcamError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

impl From<toml::de::Error> for KillcamError {
    fn from(e: toml::de::Error) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KillcamError>;
