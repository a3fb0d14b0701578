use std::path::PathBuf;

use ags_glue::surface::WaitStrategy;
use bpaf::{batteries::verbose_by_slice, construct, long, positional, OptionParser, Parser};
use log::LevelFilter;

#[derive(Debug, Clone)]
pub struct Options {
    pub log_level: LevelFilter,
    pub headless: bool,
    pub frames: u64,
    pub wait_strategy: Option<WaitStrategy>,
    pub poll_interval_ms: Option<u64>,
    pub load_last_save: bool,
    pub game: Option<PathBuf>,
}

pub fn options() -> OptionParser<Options> {
    let log_level = verbose_by_slice(
        3,
        [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ],
    );

    let headless = long("headless")
        .help("Replay a scripted window lifecycle without opening a window")
        .switch();

    let frames = long("frames")
        .help("Frames to render per lifecycle phase in headless mode")
        .argument::<u64>("N")
        .fallback(30)
        .guard(|n| *n > 0, "must be at least 1");

    let wait_strategy = long("wait")
        .help("How threads wait for each other: condvar or poll")
        .argument::<String>("STRATEGY")
        .parse(|s| WaitStrategy::parse(&s).ok_or("expected condvar or poll"))
        .optional();

    let poll_interval_ms = long("poll-ms")
        .help("Upper bound on a single wait, in milliseconds")
        .argument::<u64>("MS")
        .optional();

    let load_last_save = long("continue")
        .help("Load the most recent save game on start")
        .switch();

    let game = positional::<PathBuf>("GAME")
        .help("Game data file to run")
        .optional();

    construct!(Options {
        log_level,
        headless,
        frames,
        wait_strategy,
        poll_interval_ms,
        load_last_save,
        game,
    })
    .to_options()
    .descr("Runs an AGS game through the embedding glue")
}

#[cfg(test)]
mod tests {
    use super::options;

    #[test]
    fn check_bpaf_invariants() {
        options().check_invariants(true);
    }

    #[test]
    fn headless_flags_parse() {
        let opts = options()
            .run_inner(&["--headless", "--frames", "5", "--wait", "poll", "game.ags"])
            .unwrap();

        assert!(opts.headless);
        assert_eq!(opts.frames, 5);
        assert_eq!(opts.wait_strategy, Some(ags_glue::surface::WaitStrategy::Poll));
        assert_eq!(opts.game.as_deref(), Some(std::path::Path::new("game.ags")));
    }

    #[test]
    fn unknown_wait_strategy_is_rejected() {
        assert!(options().run_inner(&["--wait", "spin"]).is_err());
    }
}
