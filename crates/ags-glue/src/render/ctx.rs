use std::sync::Arc;

use crate::audio::AudioOutput;
use crate::device::{GraphicsBackend, SurfaceSize};
use crate::host::HostSender;
use crate::input::InputQueue;

use super::clock::FrameTime;
use super::screen::ScreenState;

/// Host-facing services shared by the host thread, the render thread and
/// the engine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GlueCtx {
    pub input: Arc<InputQueue>,
    pub host: HostSender,
    pub audio: AudioOutput,
    pub screen: Arc<ScreenState>,
}

/// Per-frame context passed to [`Engine::tick`](super::Engine::tick).
pub struct FrameCtx<'a, B: GraphicsBackend> {
    pub context: &'a mut B::Context,
    pub glue: &'a GlueCtx,
    pub time: FrameTime,

    /// Size of the surface this frame is presented to.
    pub surface: SurfaceSize,
}
