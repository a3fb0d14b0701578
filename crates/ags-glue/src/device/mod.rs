//! Graphics context and drawable surface management.
//!
//! This module is responsible for:
//! - selecting a pixel format from what the platform enumerates
//! - creating the one graphics context per view
//! - creating, presenting and recreating the drawable surface
//!
//! Platform specifics sit behind [`GraphicsBackend`]; the headless backend is
//! always available, the wgpu one behind the `wgpu` feature.

mod backend;
mod config;
mod error;
mod headless;
mod manager;
#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use backend::{GraphicsBackend, SurfaceSize};
pub use config::{
    select_config, ConfigSpec, PixelFormat, RENDERABLE_ES1, RENDERABLE_ES2, RENDERABLE_ES3,
};
pub use error::{ConfigurationError, GraphicsError, PresentError};
pub use headless::{
    FaultPlan, HeadlessBackend, HeadlessContext, HeadlessProbe, HeadlessStats, HeadlessSurface,
    HeadlessWindow,
};
pub use manager::{GraphicsContextManager, RenderSurface, SurfaceInfo};
#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuBackend, WgpuContext, WgpuSurface};
