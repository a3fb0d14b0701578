mod cli;
mod demo;
mod headless;

use std::time::Duration;

use ags_glue::device::WgpuBackend;
use ags_glue::host::{self, WinitHostConfig};
use ags_glue::logging::{init_logging, LoggingConfig};
use ags_glue::render::SessionConfig;
use ags_glue::{Glue, GlueConfig};
use anyhow::Result;
use winit::window::Window;

use demo::DemoEngine;

fn main() -> Result<()> {
    let opts = cli::options().run();

    init_logging(LoggingConfig::with_filter(opts.log_level.to_string()));

    let mut config = GlueConfig::from_env();
    if let Some(strategy) = opts.wait_strategy {
        config.wait_strategy = strategy;
    }
    if let Some(ms) = opts.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms.max(1));
    }
    log::debug!("{config:?}");

    let game_file = opts.game.unwrap_or_default();
    let base_directory = game_file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let session = SessionConfig {
        base_directory,
        app_directory: std::env::current_dir().unwrap_or_default(),
        game_file,
        load_last_save: opts.load_last_save,
    };

    if opts.headless {
        return headless::run(config, session, opts.frames);
    }

    let title = match session.game_file.file_stem() {
        Some(stem) => format!("ags - {}", stem.to_string_lossy()),
        None => "ags".to_string(),
    };
    let window = WinitHostConfig {
        title,
        ..WinitHostConfig::default()
    };

    host::run(
        window,
        Glue::new(config),
        DemoEngine::<WgpuBackend<Window>>::new(None),
        session,
    )
}
