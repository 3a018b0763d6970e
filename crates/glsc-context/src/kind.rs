//! Shader pipeline stages.

use std::fmt;

/// The pipeline stage a shader source is compiled for.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Per-vertex stage.
    Vertex,
    /// Per-primitive stage between vertex and fragment.
    Geometry,
    /// Per-fragment stage.
    Fragment,
}

impl ShaderKind {
    /// All kinds in pipeline order.
    pub const ALL: [ShaderKind; 3] = [Self::Vertex, Self::Geometry, Self::Fragment];

    /// The file suffix mapped to this kind (`.vert`, `.geom`, `.frag`).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => ".vert",
            Self::Geometry => ".geom",
            Self::Fragment => ".frag",
        }
    }

    /// Maps a five-character suffix back to its kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_round_trip() {
        for kind in ShaderKind::ALL {
            assert_eq!(ShaderKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ShaderKind::from_extension(".comp"), None);
    }
}
