use super::config::{self, ConfigSpec, PixelFormat};
use super::{GraphicsBackend, GraphicsError, SurfaceSize};

/// Result of a successful surface (re)creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceInfo {
    pub size: SurfaceSize,

    /// Number of surfaces created by this manager, this one included.
    pub generation: u64,
}

/// The two operations the render loop needs from the graphics layer.
pub trait RenderSurface {
    /// Swaps buffers; `false` means the surface was lost and has been dropped.
    fn present_current_frame(&mut self) -> bool;

    /// Replaces the current surface with a fresh one and makes it current.
    fn create_or_recreate_surface(
        &mut self,
        size: Option<SurfaceSize>,
    ) -> Result<SurfaceInfo, GraphicsError>;
}

/// Owns the graphics context, the selected pixel format and the drawable surface.
///
/// All three live on the render thread. The host thread never touches them
/// directly; it only flips flags that the render thread observes.
pub struct GraphicsContextManager<B: GraphicsBackend> {
    backend: B,
    config: Option<PixelFormat>,
    context: Option<B::Context>,
    surface: Option<B::Surface>,
    last_size: Option<SurfaceSize>,
    generation: u64,
}

impl<B: GraphicsBackend> GraphicsContextManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: None,
            context: None,
            surface: None,
            last_size: None,
            generation: 0,
        }
    }

    /// Selects a pixel format and creates the graphics context.
    ///
    /// Runs once; a second call returns the format chosen the first time.
    pub fn initialize(&mut self, spec: &ConfigSpec) -> Result<&PixelFormat, GraphicsError> {
        if self.context.is_some() {
            log::debug!("graphics context already initialized; keeping it");
            return self.config.as_ref().ok_or(GraphicsError::NotInitialized);
        }

        let available = self.backend.enumerate_configs()?;
        config::log_available_configs(&available);

        let format = config::select_config(&available, spec)?;
        log::info!("selected {format} for {spec}");

        let context = self.backend.create_context(&format, spec.api_version)?;

        self.context = Some(context);
        Ok(self.config.insert(format))
    }

    /// Tears down the current surface (if any) and creates a new one.
    ///
    /// On failure no surface is bound; the caller decides whether to retry.
    pub fn create_or_recreate_surface(
        &mut self,
        size: Option<SurfaceSize>,
    ) -> Result<SurfaceInfo, GraphicsError> {
        let (Some(context), Some(format)) = (self.context.as_ref(), self.config.as_ref()) else {
            return Err(GraphicsError::NotInitialized);
        };

        if let Some(old) = self.surface.take() {
            if let Err(e) = self.backend.make_current(context, None) {
                log::warn!("failed to unbind surface before recreation: {e}");
            }
            self.backend.destroy_surface(context, old);
        }

        let requested = size.or(self.last_size);
        let surface = self.backend.create_surface(context, format, requested)?;

        if let Err(e) = self.backend.make_current(context, Some(&surface)) {
            self.backend.destroy_surface(context, surface);
            return Err(e);
        }

        let size = self.backend.surface_size(&surface);
        self.surface = Some(surface);
        self.last_size = Some(size);
        self.generation += 1;

        log::debug!("surface #{} created ({size})", self.generation);

        Ok(SurfaceInfo {
            size,
            generation: self.generation,
        })
    }

    /// Presents the current frame.
    ///
    /// A failed swap is expected whenever the window disappears under the
    /// surface; the surface is dropped and `false` returned.
    pub fn present_current_frame(&mut self) -> bool {
        let (Some(context), Some(surface)) = (self.context.as_mut(), self.surface.as_mut()) else {
            return false;
        };

        match self.backend.swap_buffers(context, surface) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("present failed: {e}");
                self.release_surface();
                false
            }
        }
    }

    /// Unbinds and destroys the current surface, keeping the context.
    pub fn release_surface(&mut self) {
        let (Some(context), Some(surface)) = (self.context.as_ref(), self.surface.take()) else {
            return;
        };

        if let Err(e) = self.backend.make_current(context, None) {
            log::warn!("failed to unbind surface: {e}");
        }
        self.backend.destroy_surface(context, surface);
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Pixel format selected by [`initialize`](Self::initialize).
    pub fn config(&self) -> Option<&PixelFormat> {
        self.config.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut B::Context> {
        self.context.as_mut()
    }

    /// Size of the current surface, or of the last one if it was released.
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.last_size
    }

    /// Number of surfaces created so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: GraphicsBackend> RenderSurface for GraphicsContextManager<B> {
    fn present_current_frame(&mut self) -> bool {
        Self::present_current_frame(self)
    }

    fn create_or_recreate_surface(
        &mut self,
        size: Option<SurfaceSize>,
    ) -> Result<SurfaceInfo, GraphicsError> {
        Self::create_or_recreate_surface(self, size)
    }
}

impl<B: GraphicsBackend> Drop for GraphicsContextManager<B> {
    fn drop(&mut self) {
        self.release_surface();
    }
}
