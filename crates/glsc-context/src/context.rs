//! Dialects, limits, and the immutable capability context.

use std::fmt;

/// The shading-language profile a build targets.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum Dialect {
    /// Desktop GLSL (1.10 and later).
    #[default]
    Desktop,
    /// GLSL ES (1.00).
    Embedded,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Desktop => "GLSL",
            Self::Embedded => "GLSL ES",
        })
    }
}

/// Numeric implementation limits consulted by the compiler and linker.
///
/// Uniform limits are counted in scalar components, varyings in vec4 slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// `gl_MaxLights`.
    pub max_lights: u32,
    /// `gl_MaxClipPlanes`.
    pub max_clip_planes: u32,
    /// `gl_MaxTextureUnits`.
    pub max_texture_units: u32,
    /// `gl_MaxTextureCoords`.
    pub max_texture_coord_units: u32,
    /// `gl_MaxVertexAttribs`.
    pub max_vertex_attribs: u32,
    /// `gl_MaxVertexUniformComponents`.
    pub max_vertex_uniform_components: u32,
    /// Number of vec4 varying slots (`gl_MaxVaryingFloats / 4`).
    pub max_varying: u32,
    /// `gl_MaxVertexTextureImageUnits`.
    pub max_vertex_texture_image_units: u32,
    /// `gl_MaxCombinedTextureImageUnits`.
    pub max_combined_texture_image_units: u32,
    /// `gl_MaxTextureImageUnits`.
    pub max_texture_image_units: u32,
    /// `gl_MaxFragmentUniformComponents`.
    pub max_fragment_uniform_components: u32,
    /// `gl_MaxDrawBuffers`.
    pub max_draw_buffers: u32,
}

impl Limits {
    /// The smallest limits an implementation of `dialect` may advertise.
    pub const fn minimums(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Desktop => Self {
                max_lights: 8,
                max_clip_planes: 6,
                max_texture_units: 2,
                max_texture_coord_units: 2,
                max_vertex_attribs: 16,
                max_vertex_uniform_components: 512,
                max_varying: 8,
                max_vertex_texture_image_units: 0,
                max_combined_texture_image_units: 2,
                max_texture_image_units: 2,
                max_fragment_uniform_components: 64,
                max_draw_buffers: 1,
            },
            Dialect::Embedded => Self {
                max_lights: 0,
                max_clip_planes: 0,
                max_texture_units: 0,
                max_texture_coord_units: 0,
                max_vertex_attribs: 8,
                max_vertex_uniform_components: 128 * 4,
                max_varying: 8,
                max_vertex_texture_image_units: 0,
                max_combined_texture_image_units: 8,
                max_texture_image_units: 8,
                max_fragment_uniform_components: 16 * 4,
                max_draw_buffers: 1,
            },
        }
    }

    /// The limits this compiler is configured with before dialect minimums
    /// are applied.
    const fn configured() -> Self {
        Self {
            max_lights: 8,
            max_clip_planes: 8,
            max_texture_units: 2,
            // Above the 1.10 minimum: application shaders in the wild
            // index gl_TexCoord up to 3 without querying the limit.
            max_texture_coord_units: 4,
            max_vertex_attribs: 16,
            max_vertex_uniform_components: 512,
            max_varying: 8,
            max_vertex_texture_image_units: 0,
            max_combined_texture_image_units: 2,
            max_texture_image_units: 2,
            max_fragment_uniform_components: 64,
            max_draw_buffers: 2,
        }
    }

    /// Field-wise maximum of two limit sets.
    fn at_least(self, floor: Self) -> Self {
        Self {
            max_lights: self.max_lights.max(floor.max_lights),
            max_clip_planes: self.max_clip_planes.max(floor.max_clip_planes),
            max_texture_units: self.max_texture_units.max(floor.max_texture_units),
            max_texture_coord_units: self
                .max_texture_coord_units
                .max(floor.max_texture_coord_units),
            max_vertex_attribs: self.max_vertex_attribs.max(floor.max_vertex_attribs),
            max_vertex_uniform_components: self
                .max_vertex_uniform_components
                .max(floor.max_vertex_uniform_components),
            max_varying: self.max_varying.max(floor.max_varying),
            max_vertex_texture_image_units: self
                .max_vertex_texture_image_units
                .max(floor.max_vertex_texture_image_units),
            max_combined_texture_image_units: self
                .max_combined_texture_image_units
                .max(floor.max_combined_texture_image_units),
            max_texture_image_units: self
                .max_texture_image_units
                .max(floor.max_texture_image_units),
            max_fragment_uniform_components: self
                .max_fragment_uniform_components
                .max(floor.max_fragment_uniform_components),
            max_draw_buffers: self.max_draw_buffers.max(floor.max_draw_buffers),
        }
    }

    /// Returns `true` if every field of `self` is at least the matching
    /// field of `floor`.
    pub fn satisfies(&self, floor: &Self) -> bool {
        *self == self.at_least(*floor)
    }
}

/// Extension flags advertised to shaders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extensions {
    /// `GL_ARB_draw_buffers`.
    pub arb_draw_buffers: bool,
    /// `GL_ARB_fragment_coord_conventions`.
    pub arb_fragment_coord_conventions: bool,
    /// `GL_EXT_texture_array`.
    pub ext_texture_array: bool,
    /// `GL_NV_texture_rectangle`.
    pub nv_texture_rectangle: bool,
    /// `GL_OES_standard_derivatives`.
    pub oes_standard_derivatives: bool,
}

impl Extensions {
    /// Names and availability of every extension known to the compiler.
    pub fn all(&self) -> [(&'static str, bool); 5] {
        [
            ("GL_ARB_draw_buffers", self.arb_draw_buffers),
            (
                "GL_ARB_fragment_coord_conventions",
                self.arb_fragment_coord_conventions,
            ),
            ("GL_EXT_texture_array", self.ext_texture_array),
            ("GL_NV_texture_rectangle", self.nv_texture_rectangle),
            ("GL_OES_standard_derivatives", self.oes_standard_derivatives),
        ]
    }

    /// Names of the enabled extensions, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = &'static str> {
        self.all()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
    }

    /// Returns `true` if `name` is a known and enabled extension.
    pub fn is_supported(&self, name: &str) -> bool {
        self.enabled().any(|n| n == name)
    }
}

/// Read-only compilation parameters shared by every stage of a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityContext {
    dialect: Dialect,
    limits: Limits,
    extensions: Extensions,
}

impl CapabilityContext {
    /// Builds the context for `dialect`. Limits are guaranteed to meet
    /// [`Limits::minimums`] for that dialect.
    pub fn new(dialect: Dialect) -> Self {
        let limits = Limits::configured().at_least(Limits::minimums(dialect));
        let extensions = match dialect {
            Dialect::Desktop => Extensions {
                arb_draw_buffers: true,
                arb_fragment_coord_conventions: true,
                ext_texture_array: true,
                nv_texture_rectangle: true,
                oes_standard_derivatives: false,
            },
            Dialect::Embedded => Extensions::default(),
        };
        Self {
            dialect,
            limits,
            extensions,
        }
    }

    /// The targeted dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The implementation limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The advertised extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}
