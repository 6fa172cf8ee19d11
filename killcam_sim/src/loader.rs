//! Simulated model loader with seeded latency and fault injection.

use async_trait::async_trait;
use killcam_env::{EnvError, KillcamContext, ModelHandle, ModelLoader, ModelRequest};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::context::SimContext;

/// RNG stream reserved for load latency.
const LATENCY_STREAM: u64 = 0x10AD;

/// Latency distribution of simulated loads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyModel {
    /// Mean load time in milliseconds
    pub mean_ms: f64,

    /// Standard deviation in milliseconds
    pub jitter_ms: f64,
}

impl LatencyModel {
    /// Loads complete before the next frame.
    pub fn instant() -> Self {
        Self {
            mean_ms: 0.0,
            jitter_ms: 0.0,
        }
    }

    pub fn new(mean_ms: f64, jitter_ms: f64) -> Self {
        Self { mean_ms, jitter_ms }
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::new(120.0, 40.0)
    }
}

/// Model loader that completes on the virtual clock.
///
/// Each load draws a latency from a seeded normal distribution, then waits
/// until the virtual clock has moved past its due time. Handle ids come from
/// the same stream, so a run is reproducible down to the handle ids.
pub struct SimModelLoader {
    context: Arc<SimContext>,
    latency: LatencyModel,

    /// Loads slower than this fail with `Timeout`
    timeout: Option<Duration>,

    /// Assets that always fail
    failing_assets: HashSet<String>,

    rng: Mutex<ChaCha8Rng>,
}

impl SimModelLoader {
    pub fn new(context: Arc<SimContext>, latency: LatencyModel) -> Self {
        let rng = context.derive_rng(LATENCY_STREAM);
        Self {
            context,
            latency,
            timeout: None,
            failing_assets: HashSet::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Makes every load of `asset` fail.
    pub fn with_failing_asset(mut self, asset: impl Into<String>) -> Self {
        self.failing_assets.insert(asset.into());
        self
    }

    /// Fails loads whose latency exceeds `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn draw(&self) -> (Duration, Uuid) {
        let mut rng = self.rng.lock().await;
        let millis = match Normal::new(self.latency.mean_ms, self.latency.jitter_ms) {
            Ok(normal) => normal.sample(&mut *rng),
            Err(_) => self.latency.mean_ms,
        };
        let id = Uuid::from_u128(rng.gen());
        (Duration::from_secs_f64(millis.max(0.0) / 1000.0), id)
    }

    async fn wait_until(&self, due: Duration) {
        while self.context.now() < due {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ModelLoader for SimModelLoader {
    async fn load(&self, request: ModelRequest) -> Result<ModelHandle, EnvError> {
        let (latency, id) = self.draw().await;
        let start = self.context.now();

        if let Some(timeout) = self.timeout {
            if latency > timeout {
                self.wait_until(start + timeout).await;
                return Err(EnvError::Timeout(timeout.as_millis() as u64));
            }
        }

        self.wait_until(start + latency).await;

        if self.failing_assets.contains(&request.asset) {
            return Err(EnvError::load_failed(format!("{} is corrupt", request.asset)));
        }

        // Mesh size stand-in, stable per asset
        let byte_len = request.asset.len() * 1024;
        Ok(ModelHandle::with_id(id, request.asset, byte_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(asset: &str) -> ModelRequest {
        ModelRequest::new(asset, 8.0, "blue")
    }

    #[tokio::test]
    async fn test_instant_load() {
        let ctx = SimContext::shared(42);
        let loader = SimModelLoader::new(ctx.clone(), LatencyModel::instant());

        let handle = loader.load(request("/mesh/jet.obj")).await.unwrap();
        assert_eq!(handle.asset, "/mesh/jet.obj");
        assert_eq!(ctx.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_load_waits_for_virtual_time() {
        let ctx = SimContext::shared(42);
        let loader = Arc::new(SimModelLoader::new(ctx.clone(), LatencyModel::new(500.0, 0.0)));

        let task = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load(request("/mesh/jet.obj")).await })
        };

        let mut frames = 0;
        while !task.is_finished() {
            ctx.sleep(Duration::from_millis(100)).await;
            frames += 1;
            assert!(frames < 100, "load never completed");
        }
        assert!(ctx.now() >= Duration::from_millis(500));

        let handle = task.await.unwrap().unwrap();
        assert_eq!(handle.byte_len, "/mesh/jet.obj".len() * 1024);
    }

    #[tokio::test]
    async fn test_handles_are_deterministic() {
        let a = SimModelLoader::new(SimContext::shared(7), LatencyModel::instant());
        let b = SimModelLoader::new(SimContext::shared(7), LatencyModel::instant());

        let ha = a.load(request("/mesh/a.obj")).await.unwrap();
        let hb = b.load(request("/mesh/a.obj")).await.unwrap();
        assert_eq!(ha.id, hb.id);
    }

    #[tokio::test]
    async fn test_failing_asset() {
        let loader = SimModelLoader::new(SimContext::shared(1), LatencyModel::instant())
            .with_failing_asset("/mesh/bad.obj");

        assert!(matches!(
            loader.load(request("/mesh/bad.obj")).await,
            Err(EnvError::LoadFailed(_))
        ));
        assert!(loader.load(request("/mesh/good.obj")).await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout() {
        let ctx = SimContext::shared(3);
        let loader = SimModelLoader::new(ctx.clone(), LatencyModel::new(0.0, 0.0))
            .with_timeout(Duration::ZERO);
        // Zero latency never exceeds a zero timeout
        assert!(loader.load(request("/mesh/a.obj")).await.is_ok());

        let slow = SimModelLoader::new(ctx.clone(), LatencyModel::new(5_000.0, 0.0))
            .with_timeout(Duration::ZERO);
        assert!(matches!(
            slow.load(request("/mesh/a.obj")).await,
            Err(EnvError::Timeout(0))
        ));
    }
}
