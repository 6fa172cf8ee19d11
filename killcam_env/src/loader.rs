//! Model loading abstraction for the killcam engine.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{ModelHandle, ModelRequest};

/// Abstraction for the external model (mesh) loader.
///
/// # Implementations
///
/// - **Production**: `FsModelLoader` reads assets from a directory
/// - **Simulation**: seeded loader with virtual-time latency and injected failures
///
/// # Completion Flow
///
/// ```text
/// Frame loop                 Loader task                    Loader
///   |-- spawn(load) ------------>|                            |
///   |                            |-- load(request) ---------->|
///   |   ...frames keep ticking...|                            |
///   |                            |<-- Ok(handle) -------------|
///   |<-- LoadEvent (channel) ----|                            |
///   |-- poll: flip ready flag    |                            |
/// ```
///
/// The loader never touches replay state; it only returns a handle.
#[async_trait]
pub trait ModelLoader: Send + Sync + 'static {
    /// Loads the model described by `request`.
    ///
    /// # Returns
    /// * `Ok(ModelHandle)` - The model is ready to be attached to an entity
    /// * `Err(EnvError::AssetNotFound)` - No asset at the requested path
    /// * `Err(EnvError::LoadFailed)` - The asset could not be used
    async fn load(&self, request: ModelRequest) -> Result<ModelHandle, EnvError>;
}
