//! Geometry error types

use thiserror::Error;

/// Errors raised while building or sourcing mesh geometry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The mesh has no vertices, so no distance can be computed from it
    #[error("mesh has no vertices")]
    EmptyGeometry,

    /// A triangle references a vertex that does not exist
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// A vertex coordinate is NaN or infinite
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteCoordinate { vertex: usize },

    /// The mesh source could not supply geometry for a part
    #[error("geometry unavailable: {0}")]
    Unavailable(String),
}

impl GeometryError {
    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::Unavailable(details.into())
    }
}
