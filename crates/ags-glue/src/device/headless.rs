//! In-memory graphics backend.
//!
//! Stands in for a real display: the host side attaches and detaches a
//! [`HeadlessWindow`], the render side creates contexts and surfaces against
//! it, and a [`HeadlessProbe`] reports what happened. Presenting to a detached
//! window, or through a surface made for an earlier window, fails the same way
//! a real swap does once the native window is gone.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ConfigurationError, GraphicsBackend, GraphicsError, PixelFormat, PresentError, SurfaceSize,
    RENDERABLE_ES1, RENDERABLE_ES2, RENDERABLE_ES3,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host-controlled window slot.
///
/// Every `attach` starts a new epoch; surfaces remember the epoch they were
/// created in and stop presenting once it is over.
#[derive(Debug, Clone, Default)]
pub struct HeadlessWindow {
    inner: Arc<Mutex<WindowSlot>>,
}

#[derive(Debug, Default)]
struct WindowSlot {
    size: Option<SurfaceSize>,
    epoch: u64,
}

impl HeadlessWindow {
    pub fn attach(&self, size: SurfaceSize) {
        let mut slot = lock(&self.inner);
        slot.size = Some(size);
        slot.epoch += 1;
    }

    pub fn detach(&self) {
        lock(&self.inner).size = None;
    }

    /// Changes the size of an attached window. Surfaces stay valid.
    pub fn resize(&self, size: SurfaceSize) {
        let mut slot = lock(&self.inner);
        if slot.size.is_some() {
            slot.size = Some(size);
        }
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.inner).size.is_some()
    }

    pub fn size(&self) -> Option<SurfaceSize> {
        lock(&self.inner).size
    }

    fn snapshot(&self) -> (Option<SurfaceSize>, u64) {
        let slot = lock(&self.inner);
        (slot.size, slot.epoch)
    }
}

/// Failures to inject into the next backend calls.
#[derive(Debug, Default)]
pub struct FaultPlan {
    presents: AtomicU32,
    surfaces: AtomicU32,
    context: AtomicBool,
}

impl FaultPlan {
    /// Makes the next `count` buffer swaps fail.
    pub fn fail_presents(&self, count: u32) {
        self.presents.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` surface creations fail.
    pub fn fail_surface_creations(&self, count: u32) {
        self.surfaces.store(count, Ordering::SeqCst);
    }

    pub fn fail_context_creation(&self) {
        self.context.store(true, Ordering::SeqCst);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Counters collected by the headless backend.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HeadlessStats {
    pub contexts_created: u64,
    pub surfaces_created: u64,
    pub surfaces_destroyed: u64,
    pub live_surfaces: u64,
    pub max_live_surfaces: u64,

    /// Successful buffer swaps.
    pub presents: u64,
    pub failed_presents: u64,

    /// Swap attempts made while no window was attached.
    pub presents_while_detached: u64,
}

#[derive(Debug, Default)]
struct Shared {
    stats: HeadlessStats,

    /// `(surface id, window epoch)` of the surface bound to the context.
    current: Option<(u64, u64)>,
}

/// Read-only view of a [`HeadlessBackend`] that outlives moving the backend
/// onto the render thread.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    shared: Arc<Mutex<Shared>>,
    window: HeadlessWindow,
}

impl HeadlessProbe {
    pub fn stats(&self) -> HeadlessStats {
        lock(&self.shared).stats.clone()
    }

    /// True when a surface is bound and current for the window as it is now.
    pub fn surface_is_current(&self) -> bool {
        let (size, epoch) = self.window.snapshot();
        let current = lock(&self.shared).current;
        matches!(current, Some((_, surface_epoch)) if size.is_some() && surface_epoch == epoch)
    }
}

/// Rendering context of the headless backend.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    pub format: PixelFormat,
    clear_color: [f32; 4],
    frames: u64,
}

impl HeadlessContext {
    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Frames successfully presented through this context.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[derive(Debug)]
pub struct HeadlessSurface {
    id: u64,
    epoch: u64,
    size: SurfaceSize,
}

/// Backend that renders nowhere.
#[derive(Debug)]
pub struct HeadlessBackend {
    window: HeadlessWindow,
    configs: Vec<PixelFormat>,
    display: bool,
    shared: Arc<Mutex<Shared>>,
    faults: Arc<FaultPlan>,
    next_surface_id: u64,
}

impl HeadlessBackend {
    pub fn new(window: HeadlessWindow) -> Self {
        Self {
            window,
            configs: default_configs(),
            display: true,
            shared: Arc::default(),
            faults: Arc::default(),
            next_surface_id: 0,
        }
    }

    /// Replaces the enumerated pixel formats.
    pub fn with_configs(mut self, configs: Vec<PixelFormat>) -> Self {
        self.configs = configs;
        self
    }

    /// Simulates a device without a display connection.
    pub fn without_display(mut self) -> Self {
        self.display = false;
        self
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            shared: Arc::clone(&self.shared),
            window: self.window.clone(),
        }
    }

    pub fn faults(&self) -> Arc<FaultPlan> {
        Arc::clone(&self.faults)
    }

    pub fn window(&self) -> &HeadlessWindow {
        &self.window
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Context = HeadlessContext;
    type Surface = HeadlessSurface;

    fn enumerate_configs(&mut self) -> Result<Vec<PixelFormat>, GraphicsError> {
        if !self.display {
            return Err(ConfigurationError::NoDisplay("headless display disabled".into()).into());
        }
        Ok(self.configs.clone())
    }

    fn create_context(
        &mut self,
        format: &PixelFormat,
        _api_version: u8,
    ) -> Result<Self::Context, GraphicsError> {
        if self.faults.context.load(Ordering::SeqCst) {
            return Err(ConfigurationError::ContextCreation("injected failure".into()).into());
        }

        lock(&self.shared).stats.contexts_created += 1;

        Ok(HeadlessContext {
            format: *format,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames: 0,
        })
    }

    fn create_surface(
        &mut self,
        _context: &Self::Context,
        _format: &PixelFormat,
        size: Option<SurfaceSize>,
    ) -> Result<Self::Surface, GraphicsError> {
        if FaultPlan::take(&self.faults.surfaces) {
            return Err(GraphicsError::SurfaceCreation("injected failure".into()));
        }

        let (window_size, epoch) = self.window.snapshot();
        let Some(window_size) = window_size else {
            return Err(GraphicsError::SurfaceCreation("no window attached".into()));
        };

        self.next_surface_id += 1;

        let mut shared = lock(&self.shared);
        let stats = &mut shared.stats;
        stats.surfaces_created += 1;
        stats.live_surfaces += 1;
        stats.max_live_surfaces = stats.max_live_surfaces.max(stats.live_surfaces);

        Ok(HeadlessSurface {
            id: self.next_surface_id,
            epoch,
            size: size.unwrap_or(window_size),
        })
    }

    fn make_current(
        &mut self,
        _context: &Self::Context,
        surface: Option<&Self::Surface>,
    ) -> Result<(), GraphicsError> {
        lock(&self.shared).current = surface.map(|s| (s.id, s.epoch));
        Ok(())
    }

    fn destroy_surface(&mut self, _context: &Self::Context, surface: Self::Surface) {
        let mut shared = lock(&self.shared);
        shared.stats.live_surfaces = shared.stats.live_surfaces.saturating_sub(1);
        shared.stats.surfaces_destroyed += 1;
        if matches!(shared.current, Some((id, _)) if id == surface.id) {
            shared.current = None;
        }
    }

    fn surface_size(&self, surface: &Self::Surface) -> SurfaceSize {
        surface.size
    }

    fn swap_buffers(
        &mut self,
        context: &mut Self::Context,
        surface: &mut Self::Surface,
    ) -> Result<(), PresentError> {
        let (window_size, epoch) = self.window.snapshot();
        let mut shared = lock(&self.shared);
        let stats = &mut shared.stats;

        if window_size.is_none() {
            stats.presents_while_detached += 1;
            stats.failed_presents += 1;
            return Err(PresentError::NoWindow);
        }
        if FaultPlan::take(&self.faults.presents) {
            stats.failed_presents += 1;
            return Err(PresentError::SurfaceLost("injected failure".into()));
        }
        if surface.epoch != epoch {
            stats.failed_presents += 1;
            return Err(PresentError::SurfaceLost("surface belongs to a previous window".into()));
        }

        stats.presents += 1;
        context.frames += 1;
        Ok(())
    }
}

/// A small spread of formats resembling a typical mobile GPU.
fn default_configs() -> Vec<PixelFormat> {
    let base = PixelFormat {
        id: 0,
        renderable: RENDERABLE_ES1 | RENDERABLE_ES2,
        red_bits: 5,
        green_bits: 6,
        blue_bits: 5,
        alpha_bits: 0,
        depth_bits: 16,
        stencil_bits: 0,
        samples: 0,
    };

    vec![
        base,
        PixelFormat {
            id: 1,
            renderable: RENDERABLE_ES2 | RENDERABLE_ES3,
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 8,
            depth_bits: 24,
            stencil_bits: 8,
            ..base
        },
        PixelFormat {
            id: 2,
            renderable: RENDERABLE_ES2 | RENDERABLE_ES3,
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            depth_bits: 24,
            stencil_bits: 8,
            ..base
        },
        PixelFormat {
            id: 3,
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            depth_bits: 0,
            samples: 4,
            ..base
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{select_config, ConfigSpec};

    #[test]
    fn default_configs_offer_opaque_rgb888() {
        let picked = select_config(&default_configs(), &ConfigSpec::default()).unwrap();
        assert_eq!(picked.id, 2);
        assert_eq!(picked.alpha_bits, 0);
    }

    #[test]
    fn surface_creation_needs_an_attached_window() {
        let window = HeadlessWindow::default();
        let mut backend = HeadlessBackend::new(window.clone());
        let format = default_configs()[2];
        let ctx = backend.create_context(&format, 2).unwrap();

        assert!(backend.create_surface(&ctx, &format, None).is_err());

        window.attach(SurfaceSize::new(320, 200));
        let surface = backend.create_surface(&ctx, &format, None).unwrap();
        assert_eq!(backend.surface_size(&surface), SurfaceSize::new(320, 200));
    }

    #[test]
    fn fault_plan_counts_down() {
        let faults = FaultPlan::default();
        faults.fail_presents(2);
        assert!(FaultPlan::take(&faults.presents));
        assert!(FaultPlan::take(&faults.presents));
        assert!(!FaultPlan::take(&faults.presents));
    }

    #[test]
    fn reattaching_starts_a_new_epoch() {
        let window = HeadlessWindow::default();
        let mut backend = HeadlessBackend::new(window.clone());
        let probe = backend.probe();
        let format = default_configs()[2];
        let mut ctx = backend.create_context(&format, 2).unwrap();

        window.attach(SurfaceSize::new(800, 480));
        let mut surface = backend.create_surface(&ctx, &format, None).unwrap();
        backend.make_current(&ctx, Some(&surface)).unwrap();
        assert!(probe.surface_is_current());

        window.detach();
        window.attach(SurfaceSize::new(800, 480));
        assert!(!probe.surface_is_current());
        assert!(backend.swap_buffers(&mut ctx, &mut surface).is_err());
        assert_eq!(probe.stats().presents_while_detached, 0);
    }

    #[test]
    fn resize_keeps_surfaces_valid() {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(800, 480));
        let mut backend = HeadlessBackend::new(window.clone());
        let format = default_configs()[2];
        let mut ctx = backend.create_context(&format, 2).unwrap();
        let mut surface = backend.create_surface(&ctx, &format, None).unwrap();

        window.resize(SurfaceSize::new(480, 800));

        assert!(backend.swap_buffers(&mut ctx, &mut surface).is_ok());
        assert_eq!(ctx.frames(), 1);
    }
}
