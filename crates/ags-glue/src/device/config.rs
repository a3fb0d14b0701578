use std::fmt;

use super::ConfigurationError;

/// Renderable-type bit for OpenGL ES 1.x.
pub const RENDERABLE_ES1: u32 = 0x0001;
/// Renderable-type bit for OpenGL ES 2.x.
pub const RENDERABLE_ES2: u32 = 0x0004;
/// Renderable-type bit for OpenGL ES 3.x.
pub const RENDERABLE_ES3: u32 = 0x0040;

/// Desired pixel format, as requested by the engine.
///
/// Color and depth/stencil sizes are minimums. `alpha_bits` must match
/// exactly: a framebuffer alpha channel makes the window blend with whatever
/// is behind it, so the default asks for none.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ConfigSpec {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,

    /// GL-ES major version the context is created for.
    pub api_version: u8,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 0,
            depth_bits: 0,
            stencil_bits: 0,
            api_version: 2,
        }
    }
}

impl fmt::Display for ConfigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ES{} rgb={}/{}/{} alpha={} depth>={} stencil>={}",
            self.api_version,
            self.red_bits,
            self.green_bits,
            self.blue_bits,
            self.alpha_bits,
            self.depth_bits,
            self.stencil_bits,
        )
    }
}

impl ConfigSpec {
    /// Renderable-type bit required for `api_version`, if the version is known.
    pub fn renderable_bit(&self) -> Option<u32> {
        match self.api_version {
            1 => Some(RENDERABLE_ES1),
            2 => Some(RENDERABLE_ES2),
            3 => Some(RENDERABLE_ES3),
            _ => None,
        }
    }

    /// Returns true if `format` satisfies every constraint of this spec.
    pub fn matches(&self, format: &PixelFormat) -> bool {
        let Some(bit) = self.renderable_bit() else {
            return false;
        };

        format.renderable & bit != 0
            && format.red_bits >= self.red_bits
            && format.green_bits >= self.green_bits
            && format.blue_bits >= self.blue_bits
            && format.alpha_bits == self.alpha_bits
            && format.depth_bits >= self.depth_bits
            && format.stencil_bits >= self.stencil_bits
    }
}

/// One pixel-format configuration offered by the platform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PixelFormat {
    /// Platform identifier, opaque outside the backend that produced it.
    pub id: u32,

    /// Bitmask of `RENDERABLE_*` APIs this format can back.
    pub renderable: u32,

    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub samples: u8,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config #{} renderable={:#06x} rgba={}/{}/{}/{} depth={} stencil={} samples={}",
            self.id,
            self.renderable,
            self.red_bits,
            self.green_bits,
            self.blue_bits,
            self.alpha_bits,
            self.depth_bits,
            self.stencil_bits,
            self.samples,
        )
    }
}

/// Picks the first format in enumeration order that satisfies `spec`.
///
/// Enumeration order is the platform's; no attempt is made to rank formats.
pub fn select_config(
    available: &[PixelFormat],
    spec: &ConfigSpec,
) -> Result<PixelFormat, ConfigurationError> {
    if spec.renderable_bit().is_none() {
        return Err(ConfigurationError::UnsupportedApiVersion(spec.api_version));
    }

    available
        .iter()
        .find(|format| spec.matches(format))
        .copied()
        .ok_or(ConfigurationError::NoMatchingConfig(*spec))
}

/// Dumps every enumerated format at debug level.
pub(crate) fn log_available_configs(available: &[PixelFormat]) {
    log::debug!("platform offers {} pixel formats", available.len());
    for (index, format) in available.iter().enumerate() {
        log::debug!("  [{index}] {format}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(id: u32, rgba: [u8; 4], depth: u8, renderable: u32) -> PixelFormat {
        PixelFormat {
            id,
            renderable,
            red_bits: rgba[0],
            green_bits: rgba[1],
            blue_bits: rgba[2],
            alpha_bits: rgba[3],
            depth_bits: depth,
            stencil_bits: 0,
            samples: 0,
        }
    }

    #[test]
    fn default_spec_is_rgb888_without_alpha_on_es2() {
        let spec = ConfigSpec::default();
        assert_eq!((spec.red_bits, spec.green_bits, spec.blue_bits), (8, 8, 8));
        assert_eq!(spec.alpha_bits, 0);
        assert_eq!(spec.renderable_bit(), Some(RENDERABLE_ES2));
    }

    #[test]
    fn selects_first_match_in_enumeration_order() {
        let available = [
            fmt(1, [5, 6, 5, 0], 16, RENDERABLE_ES2),
            fmt(2, [8, 8, 8, 0], 24, RENDERABLE_ES2 | RENDERABLE_ES3),
            fmt(3, [8, 8, 8, 0], 24, RENDERABLE_ES2),
        ];

        let picked = select_config(&available, &ConfigSpec::default()).unwrap();
        assert_eq!(picked.id, 2);
    }

    #[test]
    fn first_match_wins_over_a_richer_format() {
        let available = [
            fmt(7, [8, 8, 8, 0], 0, RENDERABLE_ES2),
            fmt(8, [10, 10, 10, 0], 24, RENDERABLE_ES2),
        ];

        let picked = select_config(&available, &ConfigSpec::default()).unwrap();
        assert_eq!(picked.id, 7);
    }

    #[test]
    fn alpha_must_match_exactly() {
        let available = [fmt(1, [8, 8, 8, 8], 0, RENDERABLE_ES2)];
        let err = select_config(&available, &ConfigSpec::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoMatchingConfig(_)));

        let spec = ConfigSpec {
            alpha_bits: 8,
            ..ConfigSpec::default()
        };
        assert_eq!(select_config(&available, &spec).unwrap().id, 1);
    }

    #[test]
    fn depth_is_a_minimum() {
        let available = [
            fmt(1, [8, 8, 8, 0], 16, RENDERABLE_ES2),
            fmt(2, [8, 8, 8, 0], 24, RENDERABLE_ES2),
        ];
        let spec = ConfigSpec {
            depth_bits: 24,
            ..ConfigSpec::default()
        };

        assert_eq!(select_config(&available, &spec).unwrap().id, 2);
    }

    #[test]
    fn renderable_api_must_be_offered() {
        let available = [fmt(1, [8, 8, 8, 0], 24, RENDERABLE_ES1)];
        assert!(select_config(&available, &ConfigSpec::default()).is_err());

        let spec = ConfigSpec {
            api_version: 3,
            ..ConfigSpec::default()
        };
        let available = [fmt(4, [8, 8, 8, 0], 24, RENDERABLE_ES3)];
        assert_eq!(select_config(&available, &spec).unwrap().id, 4);
    }

    #[test]
    fn unknown_api_version_is_rejected_up_front() {
        let spec = ConfigSpec {
            api_version: 9,
            ..ConfigSpec::default()
        };
        let available = [fmt(1, [8, 8, 8, 0], 24, u32::MAX)];

        let err = select_config(&available, &spec).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedApiVersion(9)));
    }

    #[test]
    fn selected_config_satisfies_every_constraint() {
        let specs = [
            ConfigSpec::default(),
            ConfigSpec {
                depth_bits: 16,
                stencil_bits: 8,
                ..ConfigSpec::default()
            },
            ConfigSpec {
                red_bits: 5,
                green_bits: 6,
                blue_bits: 5,
                ..ConfigSpec::default()
            },
        ];
        let mut available = Vec::new();
        for (id, (rgb, depth, stencil)) in [
            ([5, 6, 5], 0, 0),
            ([8, 8, 8], 16, 0),
            ([8, 8, 8], 24, 8),
            ([8, 8, 8], 0, 0),
        ]
        .into_iter()
        .enumerate()
        {
            available.push(PixelFormat {
                stencil_bits: stencil,
                ..fmt(id as u32, [rgb[0], rgb[1], rgb[2], 0], depth, RENDERABLE_ES2)
            });
        }

        for spec in specs {
            let picked = select_config(&available, &spec).unwrap();
            assert!(spec.matches(&picked), "{picked} does not satisfy {spec}");
        }
    }

    #[test]
    fn empty_enumeration_is_a_configuration_error() {
        let err = select_config(&[], &ConfigSpec::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoMatchingConfig(_)));
    }
}
