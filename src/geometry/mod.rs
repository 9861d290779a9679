//! Geometry module for conductive part surfaces
//!
//! Pure value types used by the clearance engine: points, triangles,
//! indexed meshes and axis-aligned bounding boxes. No I/O happens here.
//!
//! # Submodules
//! - `types` - Core geometric primitives (Point3D, Triangle, Mesh, BoundingBox)
//! - `spatial` - R-tree vertex index for nearest-vertex queries
//! - `error` - Geometry construction errors

mod error;
mod spatial;
mod types;

pub use error::GeometryError;

pub use types::{
    BoundingBox,
    Mesh,
    Point3D,
    Triangle,
};

pub use spatial::VertexIndex;
