use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::device::SurfaceSize;
use crate::input::InputQueue;
use crate::surface::GeometryListener;

#[derive(Debug, Clone)]
struct Metrics {
    physical: SurfaceSize,
    virtual_size: SurfaceSize,
    display: Option<SurfaceSize>,
    offset: (i32, i32),
    pending_init: Option<SurfaceSize>,
}

/// Screen metrics shared between host and render thread.
///
/// The host writes geometry after each resize rendezvous; the render thread
/// picks up the queued renderer re-initialization before its next frame.
#[derive(Debug)]
pub struct ScreenState {
    metrics: Mutex<Metrics>,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ScreenState {
    /// `display` is the full display size if the host knows it.
    pub fn new(display: Option<SurfaceSize>) -> Self {
        Self {
            metrics: Mutex::new(Metrics {
                physical: SurfaceSize::new(480, 320),
                virtual_size: SurfaceSize::new(320, 200),
                display,
                offset: (0, 0),
                pending_init: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Metrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_display_size(&self, display: Option<SurfaceSize>) {
        self.lock().display = display;
    }

    pub fn set_virtual_size(&self, size: SurfaceSize) {
        self.lock().virtual_size = size;
    }

    pub fn set_physical_resolution(&self, size: SurfaceSize) {
        self.lock().physical = size;
    }

    pub fn physical_size(&self) -> SurfaceSize {
        self.lock().physical
    }

    pub fn virtual_size(&self) -> SurfaceSize {
        self.lock().virtual_size
    }

    /// Display size minus surface size, per axis.
    pub fn offset(&self) -> (i32, i32) {
        self.lock().offset
    }

    /// Records a new surface geometry and queues a renderer re-init.
    pub fn apply_geometry(&self, size: SurfaceSize, input: &InputQueue) {
        let offset = {
            let mut m = self.lock();
            m.offset = match m.display {
                Some(display) => (
                    display.width as i32 - size.width as i32,
                    display.height as i32 - size.height as i32,
                ),
                None => (0, 0),
            };
            m.physical = size;
            m.pending_init = Some(size);
            m.offset
        };

        input.set_screen_offset(offset.0, offset.1);
        log::debug!("geometry {size}, screen offset {offset:?}");
    }

    /// The geometry the renderer still has to be initialized for, if any.
    pub fn take_pending_init(&self) -> Option<SurfaceSize> {
        self.lock().pending_init.take()
    }
}

/// Geometry listener that keeps [`ScreenState`] and the input offset in sync.
pub struct ScreenGeometry {
    screen: Arc<ScreenState>,
    input: Arc<InputQueue>,
}

impl ScreenGeometry {
    pub fn new(screen: Arc<ScreenState>, input: Arc<InputQueue>) -> Self {
        Self { screen, input }
    }
}

impl GeometryListener for ScreenGeometry {
    fn on_geometry_changed(&mut self, size: SurfaceSize) {
        self.screen.apply_geometry(size, &self.input);
    }
}
