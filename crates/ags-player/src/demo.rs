use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ags_glue::device::{GraphicsBackend, HeadlessContext, SurfaceSize, WgpuContext};
use ags_glue::input::MouseClick;
use ags_glue::render::{Engine, EngineControl, FrameCtx, GlueCtx, ScreenRequest, SessionConfig};
use anyhow::Result;

/// Something the demo can paint a frame into.
pub trait Canvas {
    fn set_clear(&mut self, rgba: [f32; 4]);
}

impl Canvas for HeadlessContext {
    fn set_clear(&mut self, rgba: [f32; 4]) {
        self.set_clear_color(rgba);
    }
}

impl Canvas for WgpuContext {
    fn set_clear(&mut self, [r, g, b, a]: [f32; 4]) {
        self.set_clear_color(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        });
    }
}

/// Stand-in engine: cycles the clear colour and echoes input.
pub struct DemoEngine<B> {
    ticks: Arc<AtomicU64>,
    frame_limit: Option<u64>,
    hue: f32,
    _backend: PhantomData<fn() -> B>,
}

impl<B> DemoEngine<B> {
    pub fn new(frame_limit: Option<u64>) -> Self {
        Self {
            ticks: Arc::default(),
            frame_limit,
            hue: 0.0,
            _backend: PhantomData,
        }
    }

    /// Frames ticked so far, readable from any thread.
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.ticks)
    }
}

fn hue_to_rgb(hue: f32) -> [f32; 4] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    // Dimmed so the window is not blinding.
    [r * 0.4, g * 0.4, b * 0.4, 1.0]
}

impl<B> Engine<B> for DemoEngine<B>
where
    B: GraphicsBackend,
    B::Context: Canvas,
{
    fn start(&mut self, session: &SessionConfig, glue: &GlueCtx) -> Result<ScreenRequest> {
        log::info!(
            "demo engine starting {} (continue: {})",
            session.game_file.display(),
            session.load_last_save
        );
        glue.host.set_rotation(2);
        glue.host.show_toast("demo engine running");
        Ok(ScreenRequest::default())
    }

    fn on_geometry_changed(&mut self, context: &mut B::Context, size: SurfaceSize) -> Result<()> {
        log::info!("renderer initialized for {size}");
        context.set_clear(hue_to_rgb(self.hue));
        Ok(())
    }

    fn tick(&mut self, ctx: &mut FrameCtx<'_, B>) -> Result<EngineControl> {
        let input = &ctx.glue.input;

        let key = input.poll_keyboard();
        if key != 0 {
            log::debug!("key {:#x}", key);
        }
        if let Some(click) = MouseClick::from_code(input.poll_mouse_buttons()) {
            let pos = input.poll_mouse_absolute();
            log::debug!("{click:?} at ({}, {})", pos & 0xFFFF, (pos >> 16) & 0xFFFF);
            self.hue += 0.5;
        }
        input.poll_mouse_relative();

        self.hue += ctx.time.dt * 0.1;
        ctx.context.set_clear(hue_to_rgb(self.hue));

        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        match self.frame_limit {
            Some(limit) if ticks >= limit => Ok(EngineControl::Exit),
            _ => Ok(EngineControl::Continue),
        }
    }

    fn on_pause(&mut self) {
        log::info!("demo engine paused at frame {}", self.ticks.load(Ordering::Relaxed));
    }

    fn on_resume(&mut self) {
        log::info!("demo engine resumed");
    }

    fn shutdown(&mut self) {
        log::info!("demo engine stopped after {} frames", self.ticks.load(Ordering::Relaxed));
    }
}
