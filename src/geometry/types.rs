//! Core geometry types for conductive part surfaces
//!
//! Coordinates are in meters. Points double as free vectors for the
//! handful of operations the distance engine needs.

use super::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, Mul, Sub};

/// A 3D point (or vector) in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn dot(&self, other: &Point3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn distance_squared(&self, other: &Point3D) -> f64 {
        (*self - *other).norm_squared()
    }

    pub fn distance(&self, other: &Point3D) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Bit-exact key for vertex deduplication (-0.0 and 0.0 collapse)
    fn dedup_key(&self) -> [u64; 3] {
        let canonical = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        [canonical(self.x), canonical(self.y), canonical(self.z)]
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Point3D> for [f64; 3] {
    fn from(p: Point3D) -> Self {
        p.to_array()
    }
}

impl Add for Point3D {
    type Output = Point3D;
    fn add(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Point3D;
    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3D {
    type Output = Point3D;
    fn mul(self, rhs: f64) -> Point3D {
        Point3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Triangle held by value. Degenerate triangles are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3D,
    pub v1: Point3D,
    pub v2: Point3D,
}

impl Triangle {
    pub const fn new(v0: Point3D, v1: Point3D, v2: Point3D) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn vertices(&self) -> [Point3D; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Triangulated surface: deduplicated vertices plus index triples.
///
/// Every index is guaranteed in range. A mesh without triangles is a
/// point cloud and only takes part in vertex-to-vertex queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeshData")]
pub struct Mesh {
    vertices: Vec<Point3D>,
    triangles: Vec<[u32; 3]>,
}

/// Unvalidated wire shape of a mesh
#[derive(Deserialize)]
struct MeshData {
    vertices: Vec<Point3D>,
    #[serde(default)]
    triangles: Vec<[u32; 3]>,
}

impl TryFrom<MeshData> for Mesh {
    type Error = GeometryError;

    fn try_from(data: MeshData) -> Result<Self, Self::Error> {
        Mesh::new(data.vertices, data.triangles)
    }
}

impl Mesh {
    /// Build a mesh, checking finite coordinates and index bounds
    pub fn new(vertices: Vec<Point3D>, triangles: Vec<[u32; 3]>) -> Result<Self, GeometryError> {
        if let Some(vertex) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate { vertex });
        }

        let vertex_count = vertices.len();
        for (triangle, indices) in triangles.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(Self { vertices, triangles })
    }

    /// Vertex-only mesh
    pub fn point_cloud(vertices: Vec<Point3D>) -> Result<Self, GeometryError> {
        Self::new(vertices, Vec::new())
    }

    /// Build an indexed mesh from free-standing triangles, merging vertices
    /// with identical coordinates
    pub fn from_triangle_soup(soup: &[[Point3D; 3]]) -> Result<Self, GeometryError> {
        let mut lookup: HashMap<[u64; 3], u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut triangles = Vec::with_capacity(soup.len());

        for tri in soup {
            let mut indices = [0u32; 3];
            for (slot, point) in indices.iter_mut().zip(tri.iter()) {
                *slot = *lookup.entry(point.dedup_key()).or_insert_with(|| {
                    vertices.push(*point);
                    (vertices.len() - 1) as u32
                });
            }
            triangles.push(indices);
        }

        Self::new(vertices, triangles)
    }

    pub fn vertices(&self) -> &[Point3D] {
        &self.vertices
    }

    pub fn triangle_indices(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_point_cloud(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Resolve index triples into triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.triangles.iter().map(move |&[a, b, c]| {
            Triangle::new(
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
            )
        })
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }
}

/// Axis-aligned bounding box in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3D,
    pub max: Point3D,
}

impl BoundingBox {
    /// Build from two corners in any order
    pub fn from_corners(a: Point3D, b: Point3D) -> Self {
        Self {
            min: Point3D::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3D::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn from_points(points: &[Point3D]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(
            BoundingBox { min: *first, max: *first },
            |bb, p| BoundingBox::from_corners(
                Point3D::new(bb.min.x.min(p.x), bb.min.y.min(p.y), bb.min.z.min(p.z)),
                Point3D::new(bb.max.x.max(p.x), bb.max.y.max(p.y), bb.max.z.max(p.z)),
            ),
        ))
    }

    /// Coarse box from mass properties: a cube of edge `cbrt(volume) * 1.5`
    /// centred on the centroid. Returns `None` for a non-positive volume.
    pub fn from_mass_properties(volume_m3: f64, centroid: Point3D) -> Option<Self> {
        if !volume_m3.is_finite() || volume_m3 <= 0.0 || !centroid.is_finite() {
            return None;
        }
        let half = volume_m3.cbrt() * 1.5 / 2.0;
        let offset = Point3D::new(half, half, half);
        Some(Self {
            min: centroid - offset,
            max: centroid + offset,
        })
    }

    /// Separation between two boxes; zero when they touch or overlap
    pub fn distance(&self, other: &BoundingBox) -> f64 {
        let gap = |min_a: f64, max_a: f64, min_b: f64, max_b: f64| {
            (min_a - max_b).max(min_b - max_a).max(0.0)
        };
        let dx = gap(self.min.x, self.max.x, other.min.x, other.max.x);
        let dy = gap(self.min.y, self.max.y, other.min.y, other.max.y);
        let dz = gap(self.min.z, self.max.z, other.min.z, other.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
