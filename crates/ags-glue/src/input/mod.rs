//! Host-to-engine input mailbox.
//!
//! The host writes events as they arrive; the engine polls packed values from
//! the render thread. Each slot holds only the latest value, older events are
//! overwritten rather than queued.

mod queue;
mod types;

pub use queue::InputQueue;
pub use types::{KeyboardEvent, MouseClick};
