//! Killcam Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction that lets the killcam engine
//! run against a real clock and real asset files in production, and against a
//! virtual clock and scripted loaders in simulation.
//!
//! # Core Concept: The Frame Loop
//!
//! The engine itself is synchronous and frame-driven. Everything that touches
//! the outside world is intercepted here:
//! - Time (`now()`, `sleep()`)
//! - Background work (`spawn()`)
//! - Model/mesh loading (`ModelLoader::load()`)
//!
//! # Example
//!
//! ```ignore
//! use killcam_env::{KillcamContext, ModelLoader, ModelRequest};
//!
//! async fn frame_loop<Ctx: KillcamContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(16)).await;
//!         let now = ctx.now();
//!         tick(now);
//!     }
//! }
//! ```

mod context;
mod loader;
mod types;
mod error;
mod tokio_impl;

pub use context::KillcamContext;
pub use loader::ModelLoader;
pub use types::{ModelHandle, ModelRequest};
pub use error::EnvError;
pub use tokio_impl::{FsModelLoader, TokioContext};
