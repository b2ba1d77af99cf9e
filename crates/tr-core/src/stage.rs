//! Guest shader stages

use std::fmt;

/// A guest program stage
///
/// The guest splits vertex shading into two cooperating programs, `VertexA` feeding
/// `VertexB`, which are merged before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    VertexA,
    VertexB,
    TessellationControl,
    TessellationEval,
    Geometry,
    Fragment,
    Compute,
}

impl Stage {
    /// All graphics pipeline stages in pipeline order
    pub const GRAPHICS: [Stage; 6] = [
        Stage::VertexA,
        Stage::VertexB,
        Stage::TessellationControl,
        Stage::TessellationEval,
        Stage::Geometry,
        Stage::Fragment,
    ];

    /// Human-readable stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::VertexA => "VertexA",
            Self::VertexB => "VertexB",
            Self::TessellationControl => "TessellationControl",
            Self::TessellationEval => "TessellationEval",
            Self::Geometry => "Geometry",
            Self::Fragment => "Fragment",
            Self::Compute => "Compute",
        }
    }

    /// Whether this stage belongs to the graphics pipeline
    pub const fn is_graphics(self) -> bool {
        !matches!(self, Self::Compute)
    }

    /// Whether this stage is one half of a split vertex program
    pub const fn is_vertex(self) -> bool {
        matches!(self, Self::VertexA | Self::VertexB)
    }

    /// The shader type a well-formed program header declares for this stage
    pub const fn header_shader_type(self) -> Option<u32> {
        match self {
            Self::VertexA | Self::VertexB => Some(1),
            Self::TessellationControl => Some(2),
            Self::TessellationEval => Some(3),
            Self::Geometry => Some(4),
            Self::Fragment => Some(5),
            Self::Compute => None,
        }
    }

    /// Look a stage up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Compute]
            .into_iter()
            .chain(Self::GRAPHICS)
            .find(|stage| stage.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_stages() {
        assert!(Stage::GRAPHICS.iter().all(|stage| stage.is_graphics()));
        assert!(!Stage::Compute.is_graphics());
        assert_eq!(Stage::Compute.header_shader_type(), None);
    }

    #[test]
    fn test_split_vertex_share_header_type() {
        assert!(Stage::VertexA.is_vertex());
        assert!(Stage::VertexB.is_vertex());
        assert_eq!(
            Stage::VertexA.header_shader_type(),
            Stage::VertexB.header_shader_type()
        );
        assert_eq!(format!("{}", Stage::TessellationEval), "TessellationEval");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Stage::from_name("fragment"), Some(Stage::Fragment));
        assert_eq!(Stage::from_name("VertexA"), Some(Stage::VertexA));
        assert_eq!(Stage::from_name("compute"), Some(Stage::Compute));
        assert_eq!(Stage::from_name("pixel"), None);
    }
}
