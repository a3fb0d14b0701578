mod controller;
mod handshake;
mod signal;

pub use controller::{
    GeometryListener, LifecycleState, ResizeOutcome, SurfaceCallbacks, SurfaceLifecycleController,
};
pub use handshake::Handshake;
pub use signal::{Signal, WaitStrategy};
