use std::env;
use std::time::Duration;

use crate::device::ConfigSpec;
use crate::surface::WaitStrategy;

pub const ENV_POLL_INTERVAL_MS: &str = "AGS_POLL_INTERVAL_MS";
pub const ENV_WAIT_STRATEGY: &str = "AGS_WAIT_STRATEGY";
pub const ENV_RESIZE_TIMEOUT_MS: &str = "AGS_RESIZE_TIMEOUT_MS";

/// Session-wide glue configuration.
#[derive(Debug, Clone)]
pub struct GlueConfig {
    /// Pixel format requested from the platform.
    pub surface: ConfigSpec,

    /// Upper bound on how long either thread sleeps between re-checks.
    pub poll_interval: Duration,

    pub wait_strategy: WaitStrategy,

    /// How long the host waits for a resized surface. `None` waits until the
    /// render thread delivers one or exits.
    pub resize_timeout: Option<Duration>,

    /// How long the host waits for the render thread to drop a surface whose
    /// window is being destroyed.
    pub destroy_timeout: Duration,

    pub audio_sample_rate: u32,
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            surface: ConfigSpec::default(),
            poll_interval: Duration::from_millis(100),
            wait_strategy: WaitStrategy::Condvar,
            resize_timeout: None,
            destroy_timeout: Duration::from_secs(2),
            audio_sample_rate: 44_100,
        }
    }
}

impl GlueConfig {
    /// Defaults overridden by `AGS_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.poll_interval = Duration::from_millis(ms),
                _ => log::warn!("ignoring {ENV_POLL_INTERVAL_MS}={raw:?}"),
            }
        }

        if let Some(raw) = lookup(ENV_WAIT_STRATEGY) {
            match WaitStrategy::parse(&raw) {
                Some(strategy) => self.wait_strategy = strategy,
                None => log::warn!("ignoring {ENV_WAIT_STRATEGY}={raw:?} (expected poll|condvar)"),
            }
        }

        if let Some(raw) = lookup(ENV_RESIZE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.resize_timeout = None,
                Ok(ms) => self.resize_timeout = Some(Duration::from_millis(ms)),
                Err(_) => log::warn!("ignoring {ENV_RESIZE_TIMEOUT_MS}={raw:?}"),
            }
        }

        self
    }
}
