use std::path::PathBuf;

use anyhow::Result;

use crate::device::{GraphicsBackend, SurfaceSize};

use super::ctx::{FrameCtx, GlueCtx};

/// Control directive returned by [`Engine::tick`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EngineControl {
    Continue,
    Exit,
}

/// What the engine is asked to run.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub game_file: PathBuf,
    pub base_directory: PathBuf,
    pub app_directory: PathBuf,
    pub load_last_save: bool,
}

/// The screen the engine wants, returned from [`Engine::start`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScreenRequest {
    /// Resolution the game is authored at.
    pub virtual_size: SurfaceSize,
    pub color_depth: u8,
}

impl Default for ScreenRequest {
    fn default() -> Self {
        Self {
            virtual_size: SurfaceSize::new(320, 200),
            color_depth: 32,
        }
    }
}

/// Contract between the render thread and the embedded game engine.
///
/// Every method runs on the render thread. The engine value itself is the
/// handle to the engine library; nothing about it is global.
pub trait Engine<B: GraphicsBackend>: Send + 'static {
    /// Boots the engine for `session` and reports the screen it needs.
    fn start(&mut self, session: &SessionConfig, glue: &GlueCtx) -> Result<ScreenRequest>;

    /// The drawable surface changed size; rebuild size-dependent renderer state.
    fn on_geometry_changed(&mut self, context: &mut B::Context, size: SurfaceSize) -> Result<()> {
        let _ = (context, size);
        Ok(())
    }

    /// Runs one game frame. The frame is presented after this returns.
    fn tick(&mut self, ctx: &mut FrameCtx<'_, B>) -> Result<EngineControl>;

    fn on_pause(&mut self) {}

    fn on_resume(&mut self) {}

    /// Called once when the render loop ends, if [`start`](Self::start) succeeded.
    fn shutdown(&mut self) {}
}
