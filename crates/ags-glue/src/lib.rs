//! Embedding glue between a host windowing system and a game engine.
//!
//! The host thread reports window lifecycle changes to a
//! [`SurfaceLifecycleController`](surface::SurfaceLifecycleController); a
//! dedicated render thread owns the graphics context, runs the engine and
//! presents frames. The two meet only through the shared handshake, so a
//! resize returns once the new surface is current and a destroyed window is
//! never presented to.

pub mod audio;
pub mod config;
pub mod device;
pub mod host;
pub mod input;
pub mod logging;
pub mod render;
pub mod surface;

mod glue;

pub use config::GlueConfig;
pub use glue::Glue;
