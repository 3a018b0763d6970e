//! Shader value types.

use crate::arena::{Handle, UniqueArena};

/// The kind of a scalar or vector component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// `bool`.
    Bool,
    /// `int`.
    Int,
    /// `float`.
    Float,
}

/// Number of components in a vector, or rows/columns of a square matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum VectorSize {
    /// 2 components.
    Bi = 2,
    /// 3 components.
    Tri = 3,
    /// 4 components.
    Quad = 4,
}

impl VectorSize {
    /// Converts a component count into a size.
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    /// The component count.
    pub fn count(self) -> u32 {
        self as u32
    }
}

/// Texture dimensionality of a sampler.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SamplerDim {
    /// `sampler2D`.
    D2,
    /// `samplerCube`.
    Cube,
}

/// A value type. Types are interned in the module's [`UniqueArena`], so two
/// handles are the same type exactly when they are equal.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Type {
    /// A single component.
    Scalar(ScalarKind),
    /// A vector of components.
    Vector { size: VectorSize, kind: ScalarKind },
    /// A square float matrix with `size` columns and rows.
    Matrix { size: VectorSize },
    /// An opaque texture sampler.
    Sampler(SamplerDim),
    /// A fixed-size array.
    Array { base: Handle<Type>, size: u32 },
}

impl Type {
    /// `float`.
    pub const FLOAT: Self = Self::Scalar(ScalarKind::Float);
    /// `int`.
    pub const INT: Self = Self::Scalar(ScalarKind::Int);
    /// `bool`.
    pub const BOOL: Self = Self::Scalar(ScalarKind::Bool);
    /// `vec4`.
    pub const VEC4: Self = Self::Vector {
        size: VectorSize::Quad,
        kind: ScalarKind::Float,
    };

    /// Builds a scalar (`count == 1`) or vector type.
    pub fn vector_or_scalar(kind: ScalarKind, count: u32) -> Option<Self> {
        if count == 1 {
            return Some(Self::Scalar(kind));
        }
        VectorSize::from_count(count).map(|size| Self::Vector { size, kind })
    }

    /// Component kind of a scalar, vector, or matrix.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match *self {
            Self::Scalar(kind) | Self::Vector { kind, .. } => Some(kind),
            Self::Matrix { .. } => Some(ScalarKind::Float),
            Self::Sampler(_) | Self::Array { .. } => None,
        }
    }

    /// Number of scalar components of a scalar, vector, or matrix.
    pub fn component_count(&self) -> Option<u32> {
        match *self {
            Self::Scalar(_) => Some(1),
            Self::Vector { size, .. } => Some(size.count()),
            Self::Matrix { size } => Some(size.count() * size.count()),
            Self::Sampler(_) | Self::Array { .. } => None,
        }
    }

    /// Returns `true` for scalars and vectors.
    pub fn is_scalar_or_vector(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Vector { .. })
    }

    /// Returns `true` for float scalars, vectors, and matrices.
    pub fn is_float_based(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Float)
    }

    /// Uniform storage consumed by a value of this type, in scalar
    /// components. Samplers are counted as texture units instead.
    pub fn uniform_components(&self, types: &UniqueArena<Type>) -> u32 {
        match *self {
            Self::Array { base, size } => types[base].uniform_components(types) * size,
            Self::Sampler(_) => 0,
            _ => self.component_count().unwrap_or(0),
        }
    }

    /// vec4 slots consumed by an attribute or varying of this type.
    pub fn slots(&self, types: &UniqueArena<Type>) -> u32 {
        match *self {
            Self::Array { base, size } => types[base].slots(types) * size,
            Self::Matrix { size } => size.count(),
            Self::Sampler(_) => 0,
            Self::Scalar(_) | Self::Vector { .. } => 1,
        }
    }

    /// Number of samplers in a value of this type.
    pub fn sampler_count(&self, types: &UniqueArena<Type>) -> u32 {
        match *self {
            Self::Array { base, size } => types[base].sampler_count(types) * size,
            Self::Sampler(_) => 1,
            _ => 0,
        }
    }
}
