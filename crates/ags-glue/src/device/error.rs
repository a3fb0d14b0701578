use thiserror::Error;

use super::ConfigSpec;

/// Failures while selecting a pixel format or creating the graphics context.
///
/// Any of these means the device cannot render at all; there is no retry.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no display connection available: {0}")]
    NoDisplay(String),

    #[error("unsupported renderable API version {0}")]
    UnsupportedApiVersion(u8),

    #[error("no pixel format matches {0}")]
    NoMatchingConfig(ConfigSpec),

    #[error("graphics context creation failed: {0}")]
    ContextCreation(String),
}

/// Errors surfaced by [`GraphicsContextManager`](super::GraphicsContextManager).
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("drawable surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("graphics context has not been initialized")]
    NotInitialized,
}

impl GraphicsError {
    /// Whether this error should be reported to the user as "device unsupported".
    pub fn is_device_unsupported(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// A failed buffer swap.
///
/// This is the expected signal that the window went away underneath the
/// surface; the manager turns it into a `false` return and a recreation.
#[derive(Debug, Error)]
pub enum PresentError {
    #[error("drawable surface lost: {0}")]
    SurfaceLost(String),

    #[error("window is not attached")]
    NoWindow,
}
