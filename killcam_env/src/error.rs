//! Error types for the killcam environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The requested model asset does not exist
    #[error("Asset not found: {0}")]
    AssetNotFound(String),
    
    /// The asset exists but could not be turned into a model
    #[error("Model load failed: {0}")]
    LoadFailed(String),
    
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    /// The receiving side of a completion channel is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
    
    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a load failure.
    pub fn load_failed(msg: impl Into<String>) -> Self {
        Self::LoadFailed(msg.into())
    }
    
    /// Creates a not-found error for an asset path.
    pub fn not_found(asset: impl std::fmt::Display) -> Self {
        Self::AssetNotFound(asset.to_string())
    }
}
