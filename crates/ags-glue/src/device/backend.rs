use std::fmt;

use super::{GraphicsError, PixelFormat, PresentError};

/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Platform graphics seam used by [`GraphicsContextManager`](super::GraphicsContextManager).
///
/// Implementations wrap one display connection and one window. They report
/// platform failures as typed errors and never decide policy; retry and
/// recreation decisions live in the manager and the render thread.
pub trait GraphicsBackend: Send + 'static {
    /// Rendering context handle.
    type Context: Send;

    /// Presentable surface bound to the window.
    type Surface: Send;

    /// Lists every pixel format the display offers, in platform order.
    fn enumerate_configs(&mut self) -> Result<Vec<PixelFormat>, GraphicsError>;

    /// Creates the rendering context for `format`.
    fn create_context(
        &mut self,
        format: &PixelFormat,
        api_version: u8,
    ) -> Result<Self::Context, GraphicsError>;

    /// Creates a surface for the current window.
    ///
    /// `size` is the geometry announced by the host, if any; backends fall
    /// back to their own notion of the window size otherwise.
    fn create_surface(
        &mut self,
        context: &Self::Context,
        format: &PixelFormat,
        size: Option<SurfaceSize>,
    ) -> Result<Self::Surface, GraphicsError>;

    /// Binds `surface` to `context`, or unbinds everything when `surface` is `None`.
    fn make_current(
        &mut self,
        context: &Self::Context,
        surface: Option<&Self::Surface>,
    ) -> Result<(), GraphicsError>;

    /// Releases a surface that is no longer current.
    fn destroy_surface(&mut self, context: &Self::Context, surface: Self::Surface);

    fn surface_size(&self, surface: &Self::Surface) -> SurfaceSize;

    /// Presents the back buffer.
    fn swap_buffers(
        &mut self,
        context: &mut Self::Context,
        surface: &mut Self::Surface,
    ) -> Result<(), PresentError>;
}
