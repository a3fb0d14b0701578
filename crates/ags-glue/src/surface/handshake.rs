use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::device::SurfaceSize;

use super::{Signal, WaitStrategy};

/// State shared between the host thread and the render thread.
///
/// Ownership of each write:
/// - host: `window_available`, clearing `surface_ready`, `pending_resize`,
///   `paused`, `shutdown`
/// - render thread: setting `surface_ready`, `surface_bound`, `finished`
///
/// `surface_ready` is stored with release ordering only after the new surface
/// has been made current, so a host that observes it true with acquire
/// ordering also observes the bound surface.
#[derive(Debug)]
pub struct Handshake {
    window_available: AtomicBool,
    surface_ready: AtomicBool,
    surface_bound: AtomicBool,
    paused: AtomicBool,
    shutdown: AtomicBool,
    finished: AtomicBool,
    pending_resize: Mutex<Option<SurfaceSize>>,
    frame_lock: Mutex<()>,
    signal: Signal,
}

impl Handshake {
    pub fn new(strategy: WaitStrategy, poll_interval: Duration) -> Self {
        Self {
            window_available: AtomicBool::new(false),
            surface_ready: AtomicBool::new(false),
            surface_bound: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            pending_resize: Mutex::new(None),
            frame_lock: Mutex::new(()),
            signal: Signal::new(strategy, poll_interval),
        }
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    // host side

    pub fn set_window_available(&self, available: bool) {
        self.window_available.store(available, Ordering::Release);
        if !available {
            self.surface_ready.store(false, Ordering::Release);
        }
        self.signal.notify();
    }

    /// Records a new geometry and asks the render thread for a fresh surface.
    pub fn request_resize(&self, size: SurfaceSize) {
        {
            let mut pending = self.lock_pending();
            *pending = Some(size);
            self.surface_ready.store(false, Ordering::Release);
        }
        self.signal.notify();
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        self.signal.notify();
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.signal.notify();
    }

    // render side

    /// Publishes a freshly created, current surface.
    pub fn publish_surface_ready(&self) {
        self.surface_bound.store(true, Ordering::Release);
        self.surface_ready.store(true, Ordering::Release);
        self.signal.notify();
    }

    /// Publishes a fresh surface unless a resize arrived while it was being
    /// created. Returns false in that case; the caller must recreate again.
    ///
    /// Checked under the same lock [`request_resize`](Self::request_resize)
    /// writes under, so a host can never observe "ready" for a stale size.
    pub fn try_publish_surface_ready(&self) -> bool {
        {
            let pending = self.lock_pending();
            self.surface_bound.store(true, Ordering::Release);
            if pending.is_some() {
                return false;
            }
            self.surface_ready.store(true, Ordering::Release);
        }
        self.signal.notify();
        true
    }

    /// Announces that the render thread no longer holds a surface.
    pub fn publish_surface_released(&self) {
        self.surface_ready.store(false, Ordering::Release);
        self.surface_bound.store(false, Ordering::Release);
        self.signal.notify();
    }

    pub fn mark_finished(&self) {
        self.surface_bound.store(false, Ordering::Release);
        self.finished.store(true, Ordering::Release);
        self.signal.notify();
    }

    /// Consumes the geometry recorded by the last resize request.
    pub fn take_pending_resize(&self) -> Option<SurfaceSize> {
        self.lock_pending().take()
    }

    /// Puts back a geometry whose surface could not be created, unless the
    /// host has asked for a newer one meanwhile.
    pub fn requeue_resize(&self, size: SurfaceSize) {
        self.lock_pending().get_or_insert(size);
    }

    /// Held by the render thread around its visibility check and swap, and by
    /// the host while it pauses or withdraws the window.
    pub fn frame_lock(&self) -> MutexGuard<'_, ()> {
        self.frame_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // observers

    pub fn window_available(&self) -> bool {
        self.window_available.load(Ordering::Acquire)
    }

    pub fn surface_ready(&self) -> bool {
        self.surface_ready.load(Ordering::Acquire)
    }

    pub fn surface_bound(&self) -> bool {
        self.surface_bound.load(Ordering::Acquire)
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// True once the render thread has exited, for whatever reason.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<SurfaceSize>> {
        self.pending_resize
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
