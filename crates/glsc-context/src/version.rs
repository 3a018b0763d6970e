//! Shading-language versions.

use std::fmt;

use crate::Dialect;

/// A `#version` number together with the dialect it belongs to.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    /// The number as written after `#version` (e.g. 110, 100).
    pub number: u16,
    /// Whether this is a GLSL ES version.
    pub es: bool,
}

impl Version {
    /// The version assumed when a shader has no `#version` directive.
    pub const fn default_for(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Desktop => Self {
                number: 110,
                es: false,
            },
            Dialect::Embedded => Self {
                number: 100,
                es: true,
            },
        }
    }

    /// Version numbers accepted for `dialect`.
    pub fn supported(dialect: Dialect) -> &'static [u16] {
        match dialect {
            Dialect::Desktop => &[110, 120, 130],
            Dialect::Embedded => &[100],
        }
    }

    /// Returns `true` if `in`/`out` are usable as global storage qualifiers.
    pub fn has_in_out_globals(self) -> bool {
        !self.es && self.number >= 130
    }

    /// Returns `true` if the fixed-function built-ins (`gl_Vertex`,
    /// `gl_ModelViewProjectionMatrix`, ...) are visible.
    pub fn has_compatibility_builtins(self) -> bool {
        !self.es
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = (self.number / 100, self.number % 100);
        if self.es {
            write!(f, "GLSL ES {major}.{minor:02}")
        } else {
            write!(f, "GLSL {major}.{minor:02}")
        }
    }
}
