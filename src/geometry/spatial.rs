//! Spatial indexing for mesh vertices
//!
//! Wraps an R-tree over vertex positions so the vertex-to-vertex pass can
//! answer exact nearest-neighbor queries without the all-pairs scan.

use super::types::{Mesh, Point3D};
use rstar::RTree;

/// R-tree over the vertices of one mesh
pub struct VertexIndex {
    tree: RTree<[f64; 3]>,
}

impl VertexIndex {
    pub fn new(mesh: &Mesh) -> Self {
        let points: Vec<[f64; 3]> = mesh.vertices().iter().map(|v| v.to_array()).collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Distance from `point` to the nearest indexed vertex
    pub fn nearest_distance(&self, point: &Point3D) -> Option<f64> {
        let query = point.to_array();
        self.tree
            .nearest_neighbor(&query)
            .map(|nearest| Point3D::from(*nearest).distance(point))
    }
}
