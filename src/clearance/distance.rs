//! Mesh-to-mesh minimum distance estimation
//!
//! Three passes of increasing cost, each only ever lowering the running
//! minimum:
//! 1. vertex to vertex (R-tree nearest neighbor)
//! 2. vertex to triangle, in both directions
//! 3. triangle to triangle, only for small meshes
//!
//! The triangle pass compares each triangle's vertices against the other
//! triangle. It does not detect crossing or overlapping triangles: two
//! interpenetrating surfaces only report zero when a vertex lands exactly
//! on the other surface. Results are an approximation over the
//! triangulation, never an exact solid distance.

use crate::geometry::{GeometryError, Mesh, Point3D, Triangle, VertexIndex};
use serde::{Deserialize, Serialize};

/// Both meshes need fewer triangles than this for the triangle pass
pub const DEFAULT_TRIANGLE_PAIR_LIMIT: usize = 100;

/// Relative threshold on `det / (a * c)` (the squared sine of the corner
/// angle at v0) below which a triangle counts as degenerate
pub const DEFAULT_DEGENERATE_EPSILON: f64 = 1e-10;

/// Tuning for the distance engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub triangle_pair_limit: usize,
    pub degenerate_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            triangle_pair_limit: DEFAULT_TRIANGLE_PAIR_LIMIT,
            degenerate_epsilon: DEFAULT_DEGENERATE_EPSILON,
        }
    }
}

/// Location of the closest point relative to the triangle's parametric domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriangleRegion {
    Interior,
    BeyondEdgeV1V2,
    NearV2,
    BeyondEdgeV0V2,
    NearV0,
    BeyondEdgeV0V1,
    NearV1,
}

fn classify(s: f64, t: f64, det: f64) -> TriangleRegion {
    if s + t <= det {
        if s < 0.0 {
            if t < 0.0 {
                TriangleRegion::NearV0
            } else {
                TriangleRegion::BeyondEdgeV0V2
            }
        } else if t < 0.0 {
            TriangleRegion::BeyondEdgeV0V1
        } else {
            TriangleRegion::Interior
        }
    } else if s < 0.0 {
        TriangleRegion::NearV2
    } else if t < 0.0 {
        TriangleRegion::NearV1
    } else {
        TriangleRegion::BeyondEdgeV1V2
    }
}

/// Closest point on a triangle to `p`.
///
/// With `e1 = v1 - v0`, `e2 = v2 - v0` and `d = p - v0`, the projection of
/// `p` onto the triangle plane is `v0 + s/det * e1 + t/det * e2`. The signs
/// of `s`, `t` and `det - s - t` select one of seven regions; outside the
/// triangle the point is clamped onto the nearest edge or vertex.
/// Degenerate triangles return their nearest vertex.
#[allow(clippy::many_single_char_names)]
pub fn closest_point_on_triangle(p: &Point3D, tri: &Triangle, epsilon: f64) -> Point3D {
    let e1 = tri.v1 - tri.v0;
    let e2 = tri.v2 - tri.v0;
    let d = *p - tri.v0;

    let a = e1.dot(&e1);
    let b = e1.dot(&e2);
    let c = e2.dot(&e2);
    let d1 = e1.dot(&d);
    let d2 = e2.dot(&d);
    let det = a * c - b * b;

    if det.abs() <= epsilon * a * c {
        return nearest_vertex(p, tri);
    }

    let s = c * d1 - b * d2;
    let t = a * d2 - b * d1;

    let (s, t) = match classify(s, t, det) {
        TriangleRegion::Interior => (s / det, t / det),
        TriangleRegion::BeyondEdgeV0V1 => ((d1 / a).clamp(0.0, 1.0), 0.0),
        TriangleRegion::BeyondEdgeV0V2 => (0.0, (d2 / c).clamp(0.0, 1.0)),
        TriangleRegion::BeyondEdgeV1V2 => {
            let s = edge_v1v2_param(a, b, c, d1, d2);
            (s, 1.0 - s)
        }
        TriangleRegion::NearV0 => {
            if d1 > 0.0 {
                ((d1 / a).min(1.0), 0.0)
            } else {
                (0.0, (d2 / c).clamp(0.0, 1.0))
            }
        }
        TriangleRegion::NearV1 => {
            // Either edge v1-v2 or edge v0-v1
            let toward_v2 = a - d1;
            let toward_v0 = b - d2;
            if toward_v2 > toward_v0 {
                let s = edge_v1v2_param(a, b, c, d1, d2);
                (s, 1.0 - s)
            } else {
                ((d1 / a).clamp(0.0, 1.0), 0.0)
            }
        }
        TriangleRegion::NearV2 => {
            // Either edge v1-v2 or edge v0-v2
            let toward_v1 = c - d2;
            let toward_v0 = b - d1;
            if toward_v1 > toward_v0 {
                let s = edge_v1v2_param(a, b, c, d1, d2);
                (s, 1.0 - s)
            } else {
                (0.0, (d2 / c).clamp(0.0, 1.0))
            }
        }
    };

    tri.v0 + e1 * s + e2 * t
}

/// Parameter along v2 -> v1 of the projection onto edge v1-v2, clamped.
/// The returned `s` weights `e1`; the matching `t` is `1 - s`.
fn edge_v1v2_param(a: f64, b: f64, c: f64, d1: f64, d2: f64) -> f64 {
    let numer = (c - d2) - (b - d1);
    let denom = a - 2.0 * b + c;
    if numer <= 0.0 {
        0.0
    } else if numer >= denom {
        1.0
    } else {
        numer / denom
    }
}

fn nearest_vertex(p: &Point3D, tri: &Triangle) -> Point3D {
    tri.vertices()
        .into_iter()
        .min_by(|x, y| p.distance_squared(x).total_cmp(&p.distance_squared(y)))
        .unwrap_or(tri.v0)
}

/// Distance from a point to the closest point on a triangle
pub fn point_triangle_distance(p: &Point3D, tri: &Triangle, epsilon: f64) -> f64 {
    p.distance(&closest_point_on_triangle(p, tri, epsilon))
}

/// Triangle-to-triangle estimate: the minimum of the six vertex-to-opposite
/// triangle distances. Crossing triangles are not detected.
pub fn triangle_distance(a: &Triangle, b: &Triangle, epsilon: f64) -> f64 {
    let a_to_b = a.vertices().into_iter().map(|v| point_triangle_distance(&v, b, epsilon));
    let b_to_a = b.vertices().into_iter().map(|v| point_triangle_distance(&v, a, epsilon));
    a_to_b.chain(b_to_a).fold(f64::INFINITY, f64::min)
}

/// Running minimum after each pass, in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeshDistance {
    pub vertex_to_vertex: f64,
    pub vertex_to_triangle: f64,
    /// `None` when the meshes were too large for the triangle pass
    pub triangle_to_triangle: Option<f64>,
}

impl MeshDistance {
    /// Final estimate
    pub fn distance(&self) -> f64 {
        self.triangle_to_triangle.unwrap_or(self.vertex_to_triangle)
    }
}

/// Stateless mesh distance estimator; safe to share across threads
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryDistanceEngine {
    config: EngineConfig,
}

impl GeometryDistanceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Approximate minimum surface distance between two meshes, in meters
    pub fn minimum_distance(&self, mesh_a: &Mesh, mesh_b: &Mesh) -> Result<f64, GeometryError> {
        self.measure(mesh_a, mesh_b).map(|m| m.distance())
    }

    /// Run all passes and report the running minimum after each
    pub fn measure(&self, mesh_a: &Mesh, mesh_b: &Mesh) -> Result<MeshDistance, GeometryError> {
        if mesh_a.is_empty() || mesh_b.is_empty() {
            return Err(GeometryError::EmptyGeometry);
        }
        let eps = self.config.degenerate_epsilon;

        let vertex_to_vertex = vertex_to_vertex(mesh_a, mesh_b);

        let vertex_to_triangle = vertex_to_vertex
            .min(vertex_to_triangle(mesh_a, mesh_b, eps))
            .min(vertex_to_triangle(mesh_b, mesh_a, eps));

        let limit = self.config.triangle_pair_limit;
        let triangle_to_triangle = if mesh_a.triangle_count() < limit && mesh_b.triangle_count() < limit {
            let tri_min = mesh_a
                .triangles()
                .flat_map(|ta| mesh_b.triangles().map(move |tb| triangle_distance(&ta, &tb, eps)))
                .fold(f64::INFINITY, f64::min);
            Some(vertex_to_triangle.min(tri_min))
        } else {
            None
        };

        Ok(MeshDistance {
            vertex_to_vertex,
            vertex_to_triangle,
            triangle_to_triangle,
        })
    }
}

/// Nearest vertex pair; the smaller mesh queries an index of the larger one
fn vertex_to_vertex(mesh_a: &Mesh, mesh_b: &Mesh) -> f64 {
    let (query, indexed) = if mesh_a.vertex_count() <= mesh_b.vertex_count() {
        (mesh_a, mesh_b)
    } else {
        (mesh_b, mesh_a)
    };
    let index = VertexIndex::new(indexed);
    query
        .vertices()
        .iter()
        .filter_map(|v| index.nearest_distance(v))
        .fold(f64::INFINITY, f64::min)
}

/// Every vertex of `from` against every triangle of `to`
fn vertex_to_triangle(from: &Mesh, to: &Mesh, eps: f64) -> f64 {
    let mut min_dist = f64::INFINITY;
    for tri in to.triangles() {
        for v in from.vertices() {
            min_dist = min_dist.min(point_triangle_distance(v, &tri, eps));
        }
    }
    min_dist
}
