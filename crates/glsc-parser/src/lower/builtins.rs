//! Built-in variables and built-in function signatures.

use glsc_context::{CapabilityContext, Limits, ShaderKind, Version};
use glsc_ir::{AddressSpace, BuiltinFunction, SamplerDim, ScalarKind, Type, VectorSize};

/// A `gl_*` variable as seen by one shader stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct BuiltinVariable {
    /// Element type; arrays have `array_size` set.
    pub ty: Type,
    pub array_size: Option<u32>,
    pub space: AddressSpace,
    /// Value of `gl_Max*` constants.
    pub value: Option<i32>,
}

impl BuiltinVariable {
    fn new(ty: Type, space: AddressSpace) -> Self {
        Self {
            ty,
            array_size: None,
            space,
            value: None,
        }
    }

    fn array(ty: Type, size: u32, space: AddressSpace) -> Self {
        Self {
            array_size: Some(size),
            ..Self::new(ty, space)
        }
    }
}

const fn vec(size: VectorSize) -> Type {
    Type::Vector {
        size,
        kind: ScalarKind::Float,
    }
}

const VEC2: Type = vec(VectorSize::Bi);
const VEC3: Type = vec(VectorSize::Tri);
const MAT3: Type = Type::Matrix {
    size: VectorSize::Tri,
};
const MAT4: Type = Type::Matrix {
    size: VectorSize::Quad,
};

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Value of the implementation-limit constant `name`, if it exists in
/// `version`.
fn limit_constant(name: &str, version: Version, limits: &Limits) -> Option<i32> {
    let value = if version.es {
        match name {
            "gl_MaxVertexAttribs" => limits.max_vertex_attribs,
            "gl_MaxVertexUniformVectors" => limits.max_vertex_uniform_components / 4,
            "gl_MaxVaryingVectors" => limits.max_varying,
            "gl_MaxVertexTextureImageUnits" => limits.max_vertex_texture_image_units,
            "gl_MaxCombinedTextureImageUnits" => limits.max_combined_texture_image_units,
            "gl_MaxTextureImageUnits" => limits.max_texture_image_units,
            "gl_MaxFragmentUniformVectors" => limits.max_fragment_uniform_components / 4,
            "gl_MaxDrawBuffers" => limits.max_draw_buffers,
            _ => return None,
        }
    } else {
        match name {
            "gl_MaxLights" => limits.max_lights,
            "gl_MaxClipPlanes" => limits.max_clip_planes,
            "gl_MaxTextureUnits" => limits.max_texture_units,
            "gl_MaxTextureCoords" => limits.max_texture_coord_units,
            "gl_MaxVertexAttribs" => limits.max_vertex_attribs,
            "gl_MaxVertexUniformComponents" => limits.max_vertex_uniform_components,
            "gl_MaxVaryingFloats" => limits.max_varying * 4,
            "gl_MaxVertexTextureImageUnits" => limits.max_vertex_texture_image_units,
            "gl_MaxCombinedTextureImageUnits" => limits.max_combined_texture_image_units,
            "gl_MaxTextureImageUnits" => limits.max_texture_image_units,
            "gl_MaxFragmentUniformComponents" => limits.max_fragment_uniform_components,
            "gl_MaxDrawBuffers" => limits.max_draw_buffers,
            _ => return None,
        }
    };
    Some(clamp_i32(value))
}

/// Looks up the built-in variable `name` for a `kind` shader of `version`.
pub(super) fn lookup_variable(
    name: &str,
    kind: ShaderKind,
    version: Version,
    ctx: &CapabilityContext,
) -> Option<BuiltinVariable> {
    use AddressSpace::{Input, Output, Uniform};
    use ShaderKind::{Fragment, Geometry, Vertex};

    let limits = ctx.limits();
    if let Some(value) = limit_constant(name, version, limits) {
        return Some(BuiltinVariable {
            value: Some(value),
            ..BuiltinVariable::new(Type::INT, AddressSpace::Constant)
        });
    }

    let compat = version.has_compatibility_builtins();
    let texcoords = limits.max_texture_coord_units;
    let var = match (kind, name) {
        (_, "gl_ModelViewMatrix" | "gl_ProjectionMatrix" | "gl_ModelViewProjectionMatrix")
            if compat =>
        {
            BuiltinVariable::new(MAT4, Uniform)
        }
        (_, "gl_TextureMatrix") if compat => BuiltinVariable::array(MAT4, texcoords, Uniform),
        (_, "gl_NormalMatrix") if compat => BuiltinVariable::new(MAT3, Uniform),
        (_, "gl_NormalScale") if compat => BuiltinVariable::new(Type::FLOAT, Uniform),

        (Vertex | Geometry, "gl_Position") => BuiltinVariable::new(Type::VEC4, Output),
        (Vertex | Geometry, "gl_PointSize") => BuiltinVariable::new(Type::FLOAT, Output),
        (Vertex, "gl_ClipVertex") if compat => BuiltinVariable::new(Type::VEC4, Output),
        (Vertex, "gl_VertexID") if !version.es && version.number >= 130 => {
            BuiltinVariable::new(Type::INT, Input)
        }
        (
            Vertex,
            "gl_Vertex" | "gl_Color" | "gl_SecondaryColor" | "gl_MultiTexCoord0"
            | "gl_MultiTexCoord1" | "gl_MultiTexCoord2" | "gl_MultiTexCoord3"
            | "gl_MultiTexCoord4" | "gl_MultiTexCoord5" | "gl_MultiTexCoord6"
            | "gl_MultiTexCoord7",
        ) if compat => BuiltinVariable::new(Type::VEC4, Input),
        (Vertex, "gl_Normal") if compat => BuiltinVariable::new(VEC3, Input),
        (Vertex, "gl_FogCoord") if compat => BuiltinVariable::new(Type::FLOAT, Input),
        (
            Vertex | Geometry,
            "gl_FrontColor" | "gl_BackColor" | "gl_FrontSecondaryColor" | "gl_BackSecondaryColor",
        ) if compat => BuiltinVariable::new(Type::VEC4, Output),
        (Vertex | Geometry, "gl_TexCoord") if compat => {
            BuiltinVariable::array(Type::VEC4, texcoords, Output)
        }
        (Vertex | Geometry, "gl_FogFragCoord") if compat => {
            BuiltinVariable::new(Type::FLOAT, Output)
        }

        (Geometry, "gl_PrimitiveIDIn") => BuiltinVariable::new(Type::INT, Input),
        (Geometry, "gl_PrimitiveID") => BuiltinVariable::new(Type::INT, Output),

        (Fragment, "gl_FragCoord") => BuiltinVariable::new(Type::VEC4, Input),
        (Fragment, "gl_FrontFacing") => BuiltinVariable::new(Type::BOOL, Input),
        (Fragment, "gl_PointCoord") if version.es || version.number >= 120 => {
            BuiltinVariable::new(VEC2, Input)
        }
        (Fragment, "gl_FragColor") => BuiltinVariable::new(Type::VEC4, Output),
        (Fragment, "gl_FragData") => {
            BuiltinVariable::array(Type::VEC4, limits.max_draw_buffers, Output)
        }
        (Fragment, "gl_FragDepth") if compat => BuiltinVariable::new(Type::FLOAT, Output),
        (Fragment, "gl_Color" | "gl_SecondaryColor") if compat => {
            BuiltinVariable::new(Type::VEC4, Input)
        }
        (Fragment, "gl_TexCoord") if compat => BuiltinVariable::array(Type::VEC4, texcoords, Input),
        (Fragment, "gl_FogFragCoord") if compat => BuiltinVariable::new(Type::FLOAT, Input),
        _ => return None,
    };
    Some(var)
}

/// Returns `true` if `fun` may be called from a `kind` shader of `version`.
pub(super) fn function_available(fun: BuiltinFunction, kind: ShaderKind, version: Version) -> bool {
    use BuiltinFunction as B;
    match fun {
        B::Texture2DLod | B::TextureCubeLod => kind == ShaderKind::Vertex,
        B::DFdx | B::DFdy | B::Fwidth => kind == ShaderKind::Fragment && !version.es,
        _ => true,
    }
}

fn is_gen_float(ty: &Type) -> bool {
    ty.is_scalar_or_vector() && ty.scalar_kind() == Some(ScalarKind::Float)
}

fn is_numeric_vector(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Vector {
            kind: ScalarKind::Float | ScalarKind::Int,
            ..
        }
    )
}

fn is_bool_vector(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Vector {
            kind: ScalarKind::Bool,
            ..
        }
    )
}

fn bool_vector_like(ty: &Type) -> Option<Type> {
    match *ty {
        Type::Vector { size, .. } => Some(Type::Vector {
            size,
            kind: ScalarKind::Bool,
        }),
        _ => None,
    }
}

/// Result type of calling `fun` with arguments of type `args`, or `None`
/// if no overload matches exactly.
pub(super) fn function_result(fun: BuiltinFunction, args: &[Type]) -> Option<Type> {
    use BuiltinFunction as B;
    const F: Type = Type::FLOAT;
    const S2D: Type = Type::Sampler(SamplerDim::D2);
    const SCUBE: Type = Type::Sampler(SamplerDim::Cube);

    let result = match (fun, args) {
        (
            B::Radians
            | B::Degrees
            | B::Sin
            | B::Cos
            | B::Tan
            | B::Asin
            | B::Acos
            | B::Atan
            | B::Exp
            | B::Log
            | B::Exp2
            | B::Log2
            | B::Sqrt
            | B::InverseSqrt
            | B::Abs
            | B::Sign
            | B::Floor
            | B::Ceil
            | B::Fract
            | B::Normalize
            | B::DFdx
            | B::DFdy
            | B::Fwidth,
            [a],
        ) if is_gen_float(a) => *a,
        (B::Atan | B::Pow | B::Reflect, [a, b]) if is_gen_float(a) && a == b => *a,
        (B::Mod | B::Min | B::Max, [a, b]) if is_gen_float(a) && (a == b || *b == F) => *a,
        (B::Step, [edge, x]) if is_gen_float(x) && (edge == x || *edge == F) => *x,
        (B::Clamp, [x, lo, hi])
            if is_gen_float(x) && ((lo == x && hi == x) || (*lo == F && *hi == F)) =>
        {
            *x
        }
        (B::Mix, [a, b, t]) if is_gen_float(a) && a == b && (t == a || *t == F) => *a,
        (B::SmoothStep, [lo, hi, x])
            if is_gen_float(x) && ((lo == x && hi == x) || (*lo == F && *hi == F)) =>
        {
            *x
        }
        (B::Length, [a]) if is_gen_float(a) => F,
        (B::Distance | B::Dot, [a, b]) if is_gen_float(a) && a == b => F,
        (B::Cross, [a, b]) if *a == VEC3 && *b == VEC3 => VEC3,
        (B::FaceForward, [n, i, nref]) if is_gen_float(n) && n == i && n == nref => *n,
        (B::Refract, [i, n, eta]) if is_gen_float(i) && i == n && *eta == F => *i,
        (B::MatrixCompMult, [a, b]) if matches!(a, Type::Matrix { .. }) && a == b => *a,
        (
            B::LessThan | B::LessThanEqual | B::GreaterThan | B::GreaterThanEqual,
            [a, b],
        ) if is_numeric_vector(a) && a == b => bool_vector_like(a)?,
        (B::Equal | B::NotEqual, [a, b]) if matches!(a, Type::Vector { .. }) && a == b => {
            bool_vector_like(a)?
        }
        (B::Any | B::All, [a]) if is_bool_vector(a) => {
            Type::BOOL
        }
        (B::Not, [a]) if is_bool_vector(a) => *a,
        (B::Texture2D, [s, c]) if *s == S2D && *c == VEC2 => Type::VEC4,
        (B::Texture2D, [s, c, bias]) if *s == S2D && *c == VEC2 && *bias == F => Type::VEC4,
        (B::Texture2DProj, [s, c]) if *s == S2D && (*c == VEC3 || *c == Type::VEC4) => {
            Type::VEC4
        }
        (B::Texture2DProj, [s, c, bias])
            if *s == S2D && (*c == VEC3 || *c == Type::VEC4) && *bias == F =>
        {
            Type::VEC4
        }
        (B::Texture2DLod, [s, c, lod]) if *s == S2D && *c == VEC2 && *lod == F => Type::VEC4,
        (B::TextureCube, [s, c]) if *s == SCUBE && *c == VEC3 => Type::VEC4,
        (B::TextureCube, [s, c, bias]) if *s == SCUBE && *c == VEC3 && *bias == F => Type::VEC4,
        (B::TextureCubeLod, [s, c, lod]) if *s == SCUBE && *c == VEC3 && *lod == F => Type::VEC4,
        _ => return None,
    };
    Some(result)
}
