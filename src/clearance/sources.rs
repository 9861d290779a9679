//! Collaborator capabilities consumed by the analyzer
//!
//! The exact-distance oracle and the mesh source are external services in
//! practice. They are modeled as traits so callers can plug in a CAD
//! client, a cache, or a test double.

use super::error::MeasurementError;
use crate::geometry::{GeometryError, Mesh};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exact surface-to-surface distance between two parts, in meters
pub trait DistanceOracle: Sync {
    fn measure(&self, part_a: &str, part_b: &str) -> Result<f64, MeasurementError>;
}

impl<F> DistanceOracle for F
where
    F: Fn(&str, &str) -> Result<f64, MeasurementError> + Sync,
{
    fn measure(&self, part_a: &str, part_b: &str) -> Result<f64, MeasurementError> {
        self(part_a, part_b)
    }
}

/// Triangulated geometry for a part
pub trait MeshSource: Sync {
    fn fetch_mesh(&self, part_ref: &str) -> Result<Mesh, GeometryError>;
}

impl<F> MeshSource for F
where
    F: Fn(&str) -> Result<Mesh, GeometryError> + Sync,
{
    fn fetch_mesh(&self, part_ref: &str) -> Result<Mesh, GeometryError> {
        self(part_ref)
    }
}

/// One externally measured distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredDistance {
    pub part_a: String,
    pub part_b: String,
    pub distance_m: f64,
}

/// Oracle answering from distances measured ahead of time.
/// Lookups are order-independent.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedDistances {
    distances: HashMap<(String, String), f64>,
}

impl PrecomputedDistances {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(part_a: &str, part_b: &str) -> (String, String) {
        if part_a <= part_b {
            (part_a.to_string(), part_b.to_string())
        } else {
            (part_b.to_string(), part_a.to_string())
        }
    }

    pub fn insert(&mut self, part_a: &str, part_b: &str, distance_m: f64) {
        self.distances.insert(Self::key(part_a, part_b), distance_m);
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

impl FromIterator<MeasuredDistance> for PrecomputedDistances {
    fn from_iter<I: IntoIterator<Item = MeasuredDistance>>(iter: I) -> Self {
        let mut out = Self::new();
        for m in iter {
            out.insert(&m.part_a, &m.part_b, m.distance_m);
        }
        out
    }
}

impl DistanceOracle for PrecomputedDistances {
    fn measure(&self, part_a: &str, part_b: &str) -> Result<f64, MeasurementError> {
        self.distances
            .get(&Self::key(part_a, part_b))
            .copied()
            .ok_or_else(|| MeasurementError::NotFound(format!("{} / {}", part_a, part_b)))
    }
}
