//! Production implementations of KillcamContext and ModelLoader using Tokio.

use crate::{EnvError, KillcamContext, ModelHandle, ModelLoader, ModelRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by Tokio and the system monotonic clock.
///
/// This is the "real" implementation used when a host drives replays
/// against wall-clock time.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KillcamContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

/// Loads model assets from a directory on disk.
///
/// Asset paths are resolved relative to `root`; a leading `/` (as used by
/// web-style asset URLs) is ignored. Mesh parsing belongs to the renderer,
/// so the loader only checks that the asset is readable and non-empty.
pub struct FsModelLoader {
    root: PathBuf,
}

impl FsModelLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory assets are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an asset path against the root directory.
    pub fn resolve(&self, asset: &str) -> PathBuf {
        self.root.join(asset.trim_start_matches('/'))
    }
}

#[async_trait]
impl ModelLoader for FsModelLoader {
    async fn load(&self, request: ModelRequest) -> Result<ModelHandle, EnvError> {
        let path = self.resolve(&request.asset);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EnvError::not_found(path.display()));
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Err(EnvError::load_failed(format!("{} is empty", path.display())));
        }

        Ok(ModelHandle::new(request.asset, bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }

    #[test]
    fn test_resolve_strips_leading_slash() {
        let loader = FsModelLoader::new("/srv/assets");
        assert_eq!(
            loader.resolve("/static/mesh/Missile.AIM-120C.obj"),
            PathBuf::from("/srv/assets/static/mesh/Missile.AIM-120C.obj")
        );
    }

    #[tokio::test]
    async fn test_fs_loader_reads_asset() {
        let root = std::env::temp_dir().join(format!("killcam-env-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("mesh")).await.unwrap();
        tokio::fs::write(root.join("mesh/plane.obj"), b"v 0 0 0\n").await.unwrap();

        let loader = FsModelLoader::new(&root);
        let handle = loader
            .load(ModelRequest::new("/mesh/plane.obj", 8.0, "blue"))
            .await
            .unwrap();

        assert_eq!(handle.asset, "/mesh/plane.obj");
        assert_eq!(handle.byte_len, 8);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_loader_missing_asset() {
        let loader = FsModelLoader::new(std::env::temp_dir().join("killcam-env-missing"));
        let result = loader
            .load(ModelRequest::new("/mesh/none.obj", 8.0, "red"))
            .await;

        assert!(matches!(result, Err(EnvError::AssetNotFound(_))));
    }
}
