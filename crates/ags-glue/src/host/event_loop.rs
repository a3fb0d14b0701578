use std::sync::Arc;

use anyhow::{bail, Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{ModifiersState, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::device::{SurfaceSize, WgpuBackend};
use crate::glue::Glue;
use crate::input::MouseClick;
use crate::render::{Engine, RenderHandle, SessionConfig};
use crate::surface::SurfaceCallbacks;

use super::HostMessage;

/// Window configuration for the winit host.
#[derive(Debug, Clone)]
pub struct WinitHostConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for WinitHostConfig {
    fn default() -> Self {
        Self {
            title: "ags".to_string(),
            initial_size: LogicalSize::new(640.0, 400.0),
        }
    }
}

/// Runs a session in a desktop window until it is closed or the engine exits.
///
/// winit's resumed/suspended events stand in for surface created/destroyed,
/// `Resized` for surface changed.
pub fn run<E>(config: WinitHostConfig, glue: Glue, engine: E, session: SessionConfig) -> Result<()>
where
    E: Engine<WgpuBackend<Window>>,
{
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut host = HostState {
        config,
        glue,
        engine: Some(engine),
        session,
        window: None,
        render: None,
        error: None,
        cursor: None,
        modifiers: ModifiersState::empty(),
        suspended: false,
    };

    event_loop
        .run_app(&mut host)
        .context("winit event loop terminated with error")?;

    if let Some(e) = host.error.take() {
        return Err(e);
    }
    if let Some(render) = host.render.take() {
        render.shutdown();
        render.join().context("render thread failed")?;
    }
    Ok(())
}

struct HostState<E> {
    config: WinitHostConfig,
    glue: Glue,
    engine: Option<E>,
    session: SessionConfig,

    window: Option<Arc<Window>>,
    render: Option<RenderHandle>,
    error: Option<anyhow::Error>,

    cursor: Option<PhysicalPosition<f64>>,
    modifiers: ModifiersState,
    suspended: bool,
}

fn surface_size(size: PhysicalSize<u32>) -> SurfaceSize {
    SurfaceSize::new(size.width, size.height)
}

impl<E> HostState<E>
where
    E: Engine<WgpuBackend<Window>>,
{
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(engine) = self.engine.take() else {
            bail!("engine already started");
        };

        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let size = surface_size(window.inner_size());
        let backend = WgpuBackend::new(Arc::clone(&window), size);
        let render = self
            .glue
            .spawn(backend, engine, std::mem::take(&mut self.session))?;

        self.render = Some(render);
        self.window = Some(window);

        self.glue.controller().on_surface_available();
        self.surface_changed(size);
        Ok(())
    }

    fn surface_changed(&mut self, size: SurfaceSize) {
        if size.is_empty() || self.suspended {
            return;
        }
        self.glue.controller().on_surface_changed(size.width, size.height);
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(render) = &self.render {
            render.shutdown();
        }
        if !self.suspended {
            self.glue.controller().on_surface_destroyed();
        }
        event_loop.exit();
    }

    fn translate_input(&mut self, event: &WindowEvent) {
        let input = self.glue.input();

        match event {
            WindowEvent::ModifiersChanged(m) => self.modifiers = m.state(),

            WindowEvent::CursorMoved { position, .. } => {
                let (dx, dy) = self
                    .cursor
                    .map_or((0.0, 0.0), |last| (position.x - last.x, position.y - last.y));
                input.move_mouse(dx as f32, dy as f32, position.x as f32, position.y as f32);
                self.cursor = Some(*position);
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => match button {
                MouseButton::Left => input.click_mouse(MouseClick::Left),
                MouseButton::Right => input.click_mouse(MouseClick::Right),
                _ => {}
            },

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let keycode = match event.physical_key {
                    PhysicalKey::Code(code) => code as i32,
                    PhysicalKey::Unidentified(_) => 0,
                };
                let character = event
                    .text
                    .as_ref()
                    .and_then(|text| text.chars().next())
                    .map_or(0, |c| c as i32);
                input.keyboard_event(keycode, character, self.modifiers.shift_key());
            }

            _ => {}
        }
    }
}

fn show_host_message(window: Option<&Window>, message: HostMessage) {
    match message {
        HostMessage::SwitchToInGame => {
            log::info!("game view active");
            if let Some(window) = window {
                window.request_redraw();
            }
        }
        HostMessage::ShowMessage(text) => log::error!("{text}"),
        HostMessage::ShowToast(text) => log::info!("{text}"),
        HostMessage::SetOrientation(orientation) => {
            log::debug!("orientation {orientation:?} requested; desktop windows keep theirs");
        }
        HostMessage::EnableLongClick => log::debug!("long click enabled"),
    }
}

impl<E> ApplicationHandler for HostState<E>
where
    E: Engine<WgpuBackend<Window>>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                log::error!("failed to start session: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
            return;
        }

        if !self.suspended {
            return;
        }
        self.suspended = false;
        self.glue.controller().on_surface_available();
        if let Some(size) = self.window.as_ref().map(|w| surface_size(w.inner_size())) {
            self.surface_changed(size);
        }
        if let Some(render) = &self.render {
            render.resume();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if self.suspended || self.window.is_none() {
            return;
        }
        if let Some(render) = &self.render {
            render.pause();
        }
        self.glue.controller().on_surface_destroyed();
        self.suspended = true;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::Resized(size) => self.surface_changed(surface_size(*size)),
            _ => self.translate_input(&event),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let window = self.window.as_deref();
        for message in self.glue.messages().drain() {
            show_host_message(window, message);
        }

        if self.render.as_ref().is_some_and(RenderHandle::is_finished) {
            log::info!("render thread finished; closing");
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::wait_duration(self.glue.config().poll_interval));
    }
}
