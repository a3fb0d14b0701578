use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use ags_glue::device::{HeadlessBackend, HeadlessWindow, SurfaceSize};
use ags_glue::render::SessionConfig;
use ags_glue::surface::ResizeOutcome;
use ags_glue::{Glue, GlueConfig};
use anyhow::{bail, Context, Result};

use crate::demo::DemoEngine;

const LANDSCAPE: SurfaceSize = SurfaceSize::new(800, 480);
const PORTRAIT: SurfaceSize = SurfaceSize::new(480, 800);

/// Waits until `counter` has advanced by `frames`, or fails after a while.
fn run_frames(counter: &AtomicU64, frames: u64, phase: &str) -> Result<()> {
    let target = counter.load(Ordering::Relaxed) + frames;
    let deadline = Instant::now() + Duration::from_secs(10);

    while counter.load(Ordering::Relaxed) < target {
        if Instant::now() > deadline {
            bail!("render loop stalled during {phase}");
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn expect_ready(outcome: ResizeOutcome, size: SurfaceSize) -> Result<()> {
    if outcome != ResizeOutcome::Ready {
        bail!("resize to {size} ended with {outcome:?}");
    }
    Ok(())
}

/// Replays available, resize, pause/resume, destroy and a rotated re-create
/// against the in-memory backend, then prints what the backend saw.
pub fn run(config: GlueConfig, session: SessionConfig, frames: u64) -> Result<()> {
    let window = HeadlessWindow::default();
    window.attach(LANDSCAPE);

    let backend = HeadlessBackend::new(window.clone());
    let probe = backend.probe();

    let engine = DemoEngine::<HeadlessBackend>::new(None);
    let ticks = engine.tick_counter();

    let mut glue = Glue::new(config).with_display_size(LANDSCAPE);
    let render = glue.spawn(backend, engine, session)?;

    log::info!("phase: window available");
    glue.controller().handle_surface_available();
    expect_ready(glue.controller().handle_surface_changed(LANDSCAPE), LANDSCAPE)?;
    run_frames(&ticks, frames, "landscape")?;

    log::info!("phase: pause");
    render.pause();
    let presents = probe.stats().presents;
    thread::sleep(glue.config().poll_interval);
    if probe.stats().presents != presents {
        bail!("frames were presented while paused");
    }
    render.resume();
    run_frames(&ticks, frames, "resume")?;

    log::info!("phase: window destroyed");
    if !glue.controller().handle_surface_destroyed() {
        log::warn!("render thread kept its surface past the destroy timeout");
    }
    window.detach();
    thread::sleep(glue.config().poll_interval);

    log::info!("phase: rotated window");
    window.attach(PORTRAIT);
    glue.controller().handle_surface_available();
    expect_ready(glue.controller().handle_surface_changed(PORTRAIT), PORTRAIT)?;
    run_frames(&ticks, frames, "portrait")?;

    render.shutdown();
    render.join().context("render thread failed")?;

    for message in glue.messages().drain() {
        log::info!("host message: {message:?}");
    }

    let stats = probe.stats();
    println!("frames ticked        {}", ticks.load(Ordering::Relaxed));
    println!("frames presented     {}", stats.presents);
    println!("failed presents      {}", stats.failed_presents);
    println!("surfaces created     {}", stats.surfaces_created);
    println!("max live surfaces    {}", stats.max_live_surfaces);
    println!("presents w/o window  {}", stats.presents_while_detached);

    if stats.max_live_surfaces > 1 || stats.presents_while_detached > 0 {
        bail!("surface lifecycle violated: {stats:?}");
    }
    Ok(())
}
