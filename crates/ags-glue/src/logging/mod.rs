//! Logging utilities.
//!
//! Everything in this crate logs through the `log` facade; this module only
//! owns the one-time `env_logger` setup used by hosts and tools.

mod init;

pub use init::{init_logging, LoggingConfig};
