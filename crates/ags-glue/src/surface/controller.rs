use std::sync::Arc;
use std::time::Duration;

use crate::device::SurfaceSize;

use super::Handshake;

/// The three lifecycle notifications a host windowing layer delivers.
pub trait SurfaceCallbacks {
    /// A native window exists and surfaces can be created for it.
    fn on_surface_available(&mut self);

    /// The window has new dimensions; returns once a matching surface is current.
    fn on_surface_changed(&mut self, width: u32, height: u32);

    /// The window is going away.
    fn on_surface_destroyed(&mut self);
}

/// Receives the final geometry after a resize rendezvous.
///
/// Invoked on the host thread, after the replacement surface is current and
/// before the host's resize callback returns.
pub trait GeometryListener: Send {
    fn on_geometry_changed(&mut self, size: SurfaceSize);
}

impl<F> GeometryListener for F
where
    F: FnMut(SurfaceSize) + Send,
{
    fn on_geometry_changed(&mut self, size: SurfaceSize) {
        self(size)
    }
}

/// Surface lifecycle as seen from the host thread.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleState {
    NoWindow,
    WindowAvailable,
    Resizing,
    WindowGone,
}

/// How a resize rendezvous ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResizeOutcome {
    /// The new surface is current and listeners were notified.
    Ready,

    /// The render thread exited before producing a surface.
    RenderThreadGone,

    /// The configured resize timeout elapsed.
    TimedOut,
}

/// Drives the host side of the surface handshake.
///
/// Every method is called on the host thread. Resize and destroy
/// notifications block that thread until the render thread has caught up.
pub struct SurfaceLifecycleController {
    handshake: Arc<Handshake>,
    state: LifecycleState,
    listeners: Vec<Box<dyn GeometryListener>>,
    resize_timeout: Option<Duration>,
    destroy_timeout: Duration,
}

impl SurfaceLifecycleController {
    pub fn new(
        handshake: Arc<Handshake>,
        resize_timeout: Option<Duration>,
        destroy_timeout: Duration,
    ) -> Self {
        Self {
            handshake,
            state: LifecycleState::NoWindow,
            listeners: Vec::new(),
            resize_timeout,
            destroy_timeout,
        }
    }

    pub fn add_geometry_listener(&mut self, listener: impl GeometryListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn handle_surface_available(&mut self) {
        log::info!("surface available ({:?})", self.state);
        self.state = LifecycleState::WindowAvailable;
        self.handshake.set_window_available(true);
    }

    /// Resize rendezvous.
    ///
    /// Clears the ready flag, hands the geometry to the render thread and
    /// blocks until it reports a fresh current surface. Listeners run only if
    /// that happened.
    pub fn handle_surface_changed(&mut self, size: SurfaceSize) -> ResizeOutcome {
        if matches!(self.state, LifecycleState::NoWindow | LifecycleState::WindowGone) {
            log::warn!(
                "surface changed without a window ({:?}); treating it as available",
                self.state
            );
            self.handle_surface_available();
        }

        log::info!("surface changed to {size}; waiting for the render thread");
        self.state = LifecycleState::Resizing;
        self.handshake.request_resize(size);

        let hs = &self.handshake;
        let ready = hs
            .signal()
            .wait_until(self.resize_timeout, || hs.surface_ready() || hs.finished());

        self.state = LifecycleState::WindowAvailable;

        if !ready {
            log::warn!("timed out waiting for a {size} surface");
            return ResizeOutcome::TimedOut;
        }
        if !hs.surface_ready() {
            log::error!("render thread exited before a {size} surface was ready");
            return ResizeOutcome::RenderThreadGone;
        }

        for listener in &mut self.listeners {
            listener.on_geometry_changed(size);
        }
        ResizeOutcome::Ready
    }

    /// Marks the window gone and waits (bounded) for the render thread to
    /// drop its surface, so nothing presents into a torn-down window.
    ///
    /// Returns false if the render thread did not let go in time.
    pub fn handle_surface_destroyed(&mut self) -> bool {
        log::info!("surface destroyed ({:?})", self.state);
        {
            // Lets an in-flight swap finish before the window is marked gone.
            let _frame = self.handshake.frame_lock();
            self.state = LifecycleState::WindowGone;
            self.handshake.set_window_available(false);
        }

        let hs = &self.handshake;
        let released = hs
            .signal()
            .wait_until(Some(self.destroy_timeout), || !hs.surface_bound() || hs.finished());

        if !released {
            log::warn!(
                "render thread still holds a surface {:?} after window loss",
                self.destroy_timeout
            );
        }
        released
    }
}

impl SurfaceCallbacks for SurfaceLifecycleController {
    fn on_surface_available(&mut self) {
        self.handle_surface_available();
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.handle_surface_changed(SurfaceSize::new(width, height));
    }

    fn on_surface_destroyed(&mut self) {
        self.handle_surface_destroyed();
    }
}
