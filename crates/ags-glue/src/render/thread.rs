use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::audio::AudioOutput;
use crate::config::GlueConfig;
use crate::device::{GraphicsBackend, GraphicsContextManager, GraphicsError, SurfaceSize};
use crate::surface::Handshake;

use super::clock::FrameClock;
use super::ctx::{FrameCtx, GlueCtx};
use super::engine::{Engine, EngineControl, SessionConfig};

pub const RENDER_THREAD_NAME: &str = "ags-render";

/// Shown to the player when the device cannot provide a usable context.
pub const DEVICE_UNSUPPORTED_MESSAGE: &str =
    "This device does not support the graphics mode the game needs.";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error("engine failed: {0:#}")]
    Engine(anyhow::Error),

    #[error("render thread panicked")]
    Panicked,
}

/// Marks the render thread finished on every exit path, unwinding included.
struct FinishGuard(Arc<Handshake>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// The render thread's side of a session.
///
/// Owns the graphics context manager and the engine; nothing here is touched
/// from another thread except through [`Handshake`].
pub(crate) struct RenderThread<B: GraphicsBackend, E: Engine<B>> {
    manager: GraphicsContextManager<B>,
    engine: E,
    handshake: Arc<Handshake>,
    glue: GlueCtx,
    config: GlueConfig,
    clock: FrameClock,
    surface_size: SurfaceSize,
    started: bool,
}

impl<B, E> RenderThread<B, E>
where
    B: GraphicsBackend,
    E: Engine<B>,
{
    pub(crate) fn new(
        backend: B,
        engine: E,
        handshake: Arc<Handshake>,
        glue: GlueCtx,
        config: GlueConfig,
    ) -> Self {
        Self {
            manager: GraphicsContextManager::new(backend),
            engine,
            handshake,
            glue,
            config,
            clock: FrameClock::new(),
            surface_size: SurfaceSize::default(),
            started: false,
        }
    }

    pub(crate) fn spawn(
        self,
        session: SessionConfig,
    ) -> std::io::Result<JoinHandle<Result<(), RenderError>>> {
        thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || self.run(&session))
    }

    fn run(mut self, session: &SessionConfig) -> Result<(), RenderError> {
        let _finished = FinishGuard(Arc::clone(&self.handshake));
        log::info!("render thread started");

        let result = match self.startup(session) {
            Ok(true) => self.frame_loop(),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => log::info!("render loop finished"),
            Err(e) => log::error!("render loop failed: {e}"),
        }

        if self.started {
            self.engine.shutdown();
        }
        self.manager.release_surface();
        self.handshake.publish_surface_released();
        result
    }

    /// Boots the engine and creates the first surface.
    ///
    /// Returns `Ok(false)` if shutdown was requested before a window appeared.
    fn startup(&mut self, session: &SessionConfig) -> Result<bool, RenderError> {
        let request = self
            .engine
            .start(session, &self.glue)
            .map_err(RenderError::Engine)?;
        self.started = true;

        log::info!(
            "engine wants a {} screen at {} bpp",
            request.virtual_size,
            request.color_depth
        );
        self.glue.screen.set_virtual_size(request.virtual_size);
        self.glue.host.switch_to_in_game();

        let hs = Arc::clone(&self.handshake);
        hs.signal()
            .wait_until(None, || hs.window_available() || hs.shutdown_requested());
        if hs.shutdown_requested() {
            return Ok(false);
        }

        if let Err(e) = self.manager.initialize(&self.config.surface) {
            if e.is_device_unsupported() {
                self.glue.host.show_message(DEVICE_UNSUPPORTED_MESSAGE);
            }
            return Err(e.into());
        }

        // A failed first surface is retried by the frame loop like any other.
        match self.recreate_surface() {
            Ok(published) => {
                if !published {
                    log::debug!("first surface superseded by a newer resize");
                }
                self.glue.input.center_mouse(self.surface_size);
                self.glue
                    .screen
                    .apply_geometry(self.surface_size, &self.glue.input);
                self.deliver_pending_init()?;
            }
            Err(e) => log::warn!("first surface creation failed, retrying: {e}"),
        }

        Ok(true)
    }

    fn frame_loop(&mut self) -> Result<(), RenderError> {
        let hs = Arc::clone(&self.handshake);

        loop {
            if hs.shutdown_requested() {
                return Ok(());
            }
            if hs.paused() {
                self.park();
                continue;
            }
            if !hs.window_available() {
                self.await_window();
                continue;
            }

            if !hs.surface_ready() || !self.manager.has_surface() {
                match self.recreate_surface() {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        log::warn!("surface recreation failed, retrying: {e}");
                        thread::sleep(hs.signal().interval());
                        continue;
                    }
                }
            }

            self.deliver_pending_init()?;

            let Some(context) = self.manager.context_mut() else {
                return Err(GraphicsError::NotInitialized.into());
            };
            let mut ctx = FrameCtx::<B> {
                context,
                glue: &self.glue,
                time: self.clock.tick(),
                surface: self.surface_size,
            };
            let control = self.engine.tick(&mut ctx).map_err(RenderError::Engine)?;

            {
                // Pause and window loss flip their flags under this lock, so
                // the check and the swap cannot straddle either.
                let _frame = hs.frame_lock();
                let visible = !hs.paused() && hs.window_available();
                if visible && !self.manager.present_current_frame() {
                    // One immediate retry; a second failure in a row is fatal.
                    self.recreate_surface()?;
                }
            }

            if control == EngineControl::Exit {
                log::info!("engine requested exit");
                return Ok(());
            }
        }
    }

    /// Replaces the surface and publishes it.
    ///
    /// `Ok(false)` means a newer resize arrived meanwhile and the surface was
    /// not published.
    fn recreate_surface(&mut self) -> Result<bool, GraphicsError> {
        let hs = &self.handshake;
        let requested = hs.take_pending_resize();

        match self.manager.create_or_recreate_surface(requested) {
            Ok(info) => {
                self.surface_size = info.size;
                log::info!("surface #{} ready ({})", info.generation, info.size);
                Ok(hs.try_publish_surface_ready())
            }
            Err(e) => {
                if let Some(size) = requested {
                    hs.requeue_resize(size);
                }
                hs.publish_surface_released();
                Err(e)
            }
        }
    }

    fn deliver_pending_init(&mut self) -> Result<(), RenderError> {
        let Some(size) = self.glue.screen.take_pending_init() else {
            return Ok(());
        };
        let Some(context) = self.manager.context_mut() else {
            return Ok(());
        };

        log::debug!("initializing renderer for {size}");
        self.engine
            .on_geometry_changed(context, size)
            .map_err(RenderError::Engine)
    }

    fn release_for_window_loss(&mut self) {
        self.manager.release_surface();
        self.handshake.publish_surface_released();
        log::info!("window gone; surface released");
    }

    /// Nothing is drawn until the window comes back.
    fn await_window(&mut self) {
        if self.manager.has_surface() || self.handshake.surface_bound() {
            self.release_for_window_loss();
        }

        let hs = Arc::clone(&self.handshake);
        hs.signal().wait_until(None, || {
            hs.window_available() || hs.shutdown_requested() || hs.paused()
        });
        self.clock.reset();
    }

    /// Blocks while paused.
    ///
    /// The host may still lose or resize its window in the meantime and will
    /// block until the surface is released or replaced, so both are serviced
    /// from here.
    fn park(&mut self) {
        let hs = Arc::clone(&self.handshake);
        let can_create = self.manager.has_context();

        log::info!("render loop paused");
        self.engine.on_pause();

        while hs.paused() && !hs.shutdown_requested() {
            if !hs.window_available() {
                if self.manager.has_surface() || hs.surface_bound() {
                    self.release_for_window_loss();
                }
            } else if !hs.surface_ready() && can_create {
                if let Err(e) = self.recreate_surface() {
                    log::warn!("surface recreation while paused failed: {e}");
                    thread::sleep(hs.signal().interval());
                }
                continue;
            }

            hs.signal().wait_until(None, || {
                !hs.paused()
                    || hs.shutdown_requested()
                    || (!hs.window_available() && hs.surface_bound())
                    || (can_create && hs.window_available() && !hs.surface_ready())
            });
        }

        if !hs.shutdown_requested() {
            log::info!("render loop resumed");
            self.engine.on_resume();
        }
        self.clock.reset();
    }
}

/// Host-side handle to a running render thread.
///
/// Dropping the handle requests shutdown and joins the thread.
pub struct RenderHandle {
    handshake: Arc<Handshake>,
    audio: AudioOutput,
    thread: Option<JoinHandle<Result<(), RenderError>>>,
}

impl RenderHandle {
    pub(crate) fn new(
        handshake: Arc<Handshake>,
        audio: AudioOutput,
        thread: JoinHandle<Result<(), RenderError>>,
    ) -> Self {
        Self {
            handshake,
            audio,
            thread: Some(thread),
        }
    }

    /// Stops the game. No frame is presented after this returns.
    pub fn pause(&self) {
        {
            let _frame = self.handshake.frame_lock();
            self.handshake.set_paused(true);
        }
        self.audio.pause();
        log::info!("game paused");
    }

    pub fn resume(&self) {
        self.audio.resume();
        self.handshake.set_paused(false);
        log::info!("game resumed");
    }

    /// Asks the render loop to stop at the next frame boundary.
    pub fn shutdown(&self) {
        self.handshake.request_shutdown();
    }

    pub fn is_finished(&self) -> bool {
        self.handshake.finished()
    }

    /// Waits for the render thread to end on its own.
    pub fn join(mut self) -> Result<(), RenderError> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<(), RenderError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread.join().unwrap_or(Err(RenderError::Panicked))
    }
}

impl Drop for RenderHandle {
    fn drop(&mut self) {
        if self.thread.is_none() {
            return;
        }
        self.shutdown();
        if let Err(e) = self.join_thread() {
            log::warn!("render thread ended with an error: {e}");
        }
    }
}
