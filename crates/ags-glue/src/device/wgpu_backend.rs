//! wgpu-backed graphics backend.
//!
//! wgpu has no notion of a "current" context, so `make_current` is a no-op and
//! the context is simply the device/queue pair. Each surface is a fresh
//! `wgpu::Surface` for the window, configured at creation and never resized in
//! place.

use std::sync::Arc;

use anyhow::Context as _;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use super::{
    ConfigurationError, GraphicsBackend, GraphicsError, PixelFormat, PresentError, SurfaceSize,
    RENDERABLE_ES2, RENDERABLE_ES3,
};

/// Device, queue and presentation parameters chosen at initialization.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    clear: wgpu::Color,
}

impl WgpuContext {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Texture format of every surface created for this context.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Color the back buffer is cleared to before it is presented.
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear = color;
    }
}

/// A configured surface bound to the window.
pub struct WgpuSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// Backend presenting through wgpu into a window shared with the host.
pub struct WgpuBackend<W> {
    window: Arc<W>,
    instance: wgpu::Instance,
    adapter: Option<wgpu::Adapter>,

    /// Surface format and alpha mode behind each enumerated `PixelFormat::id`.
    formats: Vec<(wgpu::TextureFormat, wgpu::CompositeAlphaMode)>,

    present_mode: wgpu::PresentMode,
    default_size: SurfaceSize,
}

impl<W> WgpuBackend<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    /// `default_size` is used until the host announces a geometry.
    pub fn new(window: Arc<W>, default_size: SurfaceSize) -> Self {
        // Use all backends to allow wgpu to select the optimal platform backend.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        Self {
            window,
            instance,
            adapter: None,
            formats: Vec::new(),
            present_mode: wgpu::PresentMode::Fifo,
            default_size,
        }
    }

    fn create_target(&self) -> anyhow::Result<wgpu::Surface<'static>> {
        self.instance
            .create_surface(Arc::clone(&self.window))
            .context("failed to create wgpu surface")
    }
}

impl<W> GraphicsBackend for WgpuBackend<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    type Context = WgpuContext;
    type Surface = WgpuSurface;

    fn enumerate_configs(&mut self) -> Result<Vec<PixelFormat>, GraphicsError> {
        let no_display = |e: anyhow::Error| ConfigurationError::NoDisplay(format!("{e:#}"));

        let probe = self.create_target().map_err(no_display)?;
        let adapter = pollster::block_on(self.instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&probe),
                force_fallback_adapter: false,
            },
        ))
        .context("failed to find a suitable GPU adapter")
        .map_err(no_display)?;

        let caps = probe.get_capabilities(&adapter);
        log::debug!("adapter: {:?}", adapter.get_info());

        self.formats.clear();
        let mut configs = Vec::new();
        for format in caps.formats.iter().copied() {
            let Some([red, green, blue, alpha]) = channel_bits(format) else {
                continue;
            };

            for alpha_mode in caps.alpha_modes.iter().copied() {
                let alpha_bits = match alpha_mode {
                    wgpu::CompositeAlphaMode::Opaque => 0,
                    _ => alpha,
                };

                configs.push(PixelFormat {
                    id: self.formats.len() as u32,
                    renderable: RENDERABLE_ES2 | RENDERABLE_ES3,
                    red_bits: red,
                    green_bits: green,
                    blue_bits: blue,
                    alpha_bits,
                    // Depth and stencil come from a separate attachment.
                    depth_bits: 24,
                    stencil_bits: 8,
                    samples: 1,
                });
                self.formats.push((format, alpha_mode));
            }
        }

        self.adapter = Some(adapter);
        Ok(configs)
    }

    fn create_context(
        &mut self,
        format: &PixelFormat,
        _api_version: u8,
    ) -> Result<Self::Context, GraphicsError> {
        let context_error =
            |e: anyhow::Error| ConfigurationError::ContextCreation(format!("{e:#}"));

        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| ConfigurationError::NoDisplay("adapter not acquired".into()))?;

        let (texture_format, alpha_mode) = self
            .formats
            .get(format.id as usize)
            .copied()
            .ok_or_else(|| ConfigurationError::ContextCreation(format!("unknown {format}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("ags-glue device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")
        .map_err(context_error)?;

        Ok(WgpuContext {
            device,
            queue,
            format: texture_format,
            alpha_mode,
            clear: wgpu::Color::BLACK,
        })
    }

    fn create_surface(
        &mut self,
        context: &Self::Context,
        _format: &PixelFormat,
        size: Option<SurfaceSize>,
    ) -> Result<Self::Surface, GraphicsError> {
        let surface = self
            .create_target()
            .map_err(|e| GraphicsError::SurfaceCreation(format!("{e:#}")))?;

        // wgpu rejects zero-sized configurations.
        let size = size.unwrap_or(self.default_size);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: context.format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: self.present_mode,
            alpha_mode: context.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&context.device, &config);

        Ok(WgpuSurface { surface, config })
    }

    fn make_current(
        &mut self,
        _context: &Self::Context,
        _surface: Option<&Self::Surface>,
    ) -> Result<(), GraphicsError> {
        Ok(())
    }

    fn destroy_surface(&mut self, _context: &Self::Context, surface: Self::Surface) {
        drop(surface);
    }

    fn surface_size(&self, surface: &Self::Surface) -> SurfaceSize {
        SurfaceSize::new(surface.config.width, surface.config.height)
    }

    fn swap_buffers(
        &mut self,
        context: &mut Self::Context,
        surface: &mut Self::Surface,
    ) -> Result<(), PresentError> {
        let frame = match surface.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("surface acquire timed out; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(PresentError::SurfaceLost(err.to_string())),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ags-glue present encoder"),
            });

        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ags-glue clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(context.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// RGBA channel widths of the color formats a window surface commonly offers.
fn channel_bits(format: wgpu::TextureFormat) -> Option<[u8; 4]> {
    use wgpu::TextureFormat as F;

    match format {
        F::Rgba8Unorm | F::Rgba8UnormSrgb | F::Bgra8Unorm | F::Bgra8UnormSrgb => Some([8, 8, 8, 8]),
        F::Rgb10a2Unorm => Some([10, 10, 10, 2]),
        F::Rgba16Float => Some([16, 16, 16, 16]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_bits_cover_common_surface_formats() {
        assert_eq!(channel_bits(wgpu::TextureFormat::Bgra8UnormSrgb), Some([8, 8, 8, 8]));
        assert_eq!(channel_bits(wgpu::TextureFormat::Rgb10a2Unorm), Some([10, 10, 10, 2]));
        assert_eq!(channel_bits(wgpu::TextureFormat::R8Unorm), None);
    }
}
