//! The render thread and its contract with the embedded engine.
//!
//! One render thread runs per session. It boots the engine, owns the graphics
//! context, drives one engine tick per frame and presents the result, while
//! the host thread feeds it window lifecycle changes through the handshake.

mod clock;
mod ctx;
mod engine;
mod screen;
mod thread;

pub use clock::{FrameClock, FrameTime};
pub use ctx::{FrameCtx, GlueCtx};
pub use engine::{Engine, EngineControl, ScreenRequest, SessionConfig};
pub use screen::{ScreenGeometry, ScreenState};
pub use thread::{RenderError, RenderHandle, DEVICE_UNSUPPORTED_MESSAGE, RENDER_THREAD_NAME};

pub(crate) use thread::RenderThread;
