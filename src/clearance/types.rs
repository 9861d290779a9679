//! Clearance data types
//!
//! Terminal inputs, per-pair verdicts and the options recognized by the
//! verification entry point.

use super::error::ConfigurationError;
use crate::geometry::{BoundingBox, Mesh};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Required protection level, ordered from least to most restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsulationClass {
    #[serde(alias = "Functional", alias = "FUNCTIONAL")]
    Functional,
    #[default]
    #[serde(alias = "Basic", alias = "BASIC")]
    Basic,
    #[serde(alias = "Reinforced", alias = "REINFORCED")]
    Reinforced,
}

impl InsulationClass {
    pub const ALL: [InsulationClass; 3] = [
        InsulationClass::Functional,
        InsulationClass::Basic,
        InsulationClass::Reinforced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsulationClass::Functional => "functional",
            InsulationClass::Basic => "basic",
            InsulationClass::Reinforced => "reinforced",
        }
    }
}

impl fmt::Display for InsulationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsulationClass {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InsulationClass::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownInsulationClass(s.to_string()))
    }
}

/// A conductive part with its electrical ratings and optional geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    pub id: String,
    /// Display name; falls back to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Volts
    pub voltage: f64,
    /// Amperes
    #[serde(default)]
    pub current: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation_class: Option<InsulationClass>,
    /// Opaque reference handed to the oracle and mesh source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<Mesh>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
}

impl Terminal {
    pub fn new(id: impl Into<String>, voltage: f64, current: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            voltage,
            current,
            insulation_class: None,
            part_ref: None,
            mesh: None,
            bounds: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_insulation_class(mut self, class: InsulationClass) -> Self {
        self.insulation_class = Some(class);
        self
    }

    pub fn with_part_ref(mut self, part_ref: impl Into<String>) -> Self {
        self.part_ref = Some(part_ref.into());
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Ratings must be finite and non-negative
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [("voltage", self.voltage), ("current", self.current)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidRating {
                    terminal: self.id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of one pair. Pass and Fail always carry a concrete distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Inconclusive => "inconclusive",
        })
    }
}

/// Where a measured distance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    /// External exact-distance oracle
    ExactOracle,
    /// Triangulated surface approximation
    MeshGeometry,
    /// Axis-aligned box separation (coarse lower bound)
    BoundingBox,
}

/// Result for one unordered terminal pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearancePair {
    pub terminal_a: String,
    pub terminal_b: String,
    /// Governing voltage: the higher of the two terminals
    pub voltage: f64,
    /// Governing current: the higher of the two terminals
    pub current: f64,
    pub insulation_class: InsulationClass,
    pub required_clearance_mm: f64,
    /// Per-standard requirement; empty when an override was supplied
    pub clearances_by_standard: IndexMap<String, f64>,
    pub requirement: String,
    pub distance_mm: Option<f64>,
    pub distance_source: Option<DistanceSource>,
    pub verdict: Verdict,
    pub margin_mm: Option<f64>,
    /// Why the distance could not be determined (Inconclusive only)
    pub reason: Option<String>,
}

impl ClearancePair {
    /// Verdict and margin for a requirement and an optional distance
    pub fn evaluate(required_mm: f64, distance_mm: Option<f64>) -> (Verdict, Option<f64>) {
        match distance_mm {
            Some(d) if d >= required_mm => (Verdict::Pass, Some(d - required_mm)),
            Some(d) => (Verdict::Fail, Some(d - required_mm)),
            None => (Verdict::Inconclusive, None),
        }
    }

    pub fn is_concluded(&self) -> bool {
        self.verdict != Verdict::Inconclusive
    }
}

/// Options recognized by `analyze_clearances`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Replaces the per-pair insulation class when set
    pub insulation_class_override: Option<InsulationClass>,
    /// Class assumed for terminals that do not declare one
    pub default_insulation_class: InsulationClass,
    /// Standard names to apply; the worst case across them governs
    pub standards: IndexSet<String>,
    /// Skips the standards lookup entirely when set
    pub required_clearance_override_mm: Option<f64>,
    pub sort_by_distance: bool,
    /// Upper bound on pairs evaluated at once; `None` uses the global pool
    pub max_concurrency: Option<usize>,
    /// Allow the coarse box-separation estimate as a last resort
    pub allow_bounding_box_estimate: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            insulation_class_override: None,
            default_insulation_class: InsulationClass::Basic,
            standards: ["IEC 61010-1", "IEC 61439-1"]
                .into_iter()
                .map(String::from)
                .collect(),
            required_clearance_override_mm: None,
            sort_by_distance: false,
            max_concurrency: None,
            allow_bounding_box_estimate: false,
        }
    }
}
