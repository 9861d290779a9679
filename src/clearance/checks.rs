//! Per-pair clearance checking
//!
//! A pair's distance comes from an ordered list of strategies. Each one
//! either yields a distance or a note on why it could not; the notes of
//! every failed attempt become the Inconclusive reason.

use super::distance::GeometryDistanceEngine;
use super::error::ConfigurationError;
use super::sources::{DistanceOracle, MeshSource};
use super::standards::StandardsLookup;
use super::types::{AnalysisOptions, ClearancePair, DistanceSource, InsulationClass, Terminal};
use crate::geometry::{BoundingBox, Mesh};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MM_PER_M: f64 = 1000.0;

/// One way of obtaining a pair's separation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStrategy {
    ExactOracle,
    MeshGeometry,
    BoundingBox,
}

impl DistanceStrategy {
    /// Strategies in the order they are tried
    pub fn chain(allow_bounding_box: bool) -> Vec<DistanceStrategy> {
        let mut chain = vec![DistanceStrategy::ExactOracle, DistanceStrategy::MeshGeometry];
        if allow_bounding_box {
            chain.push(DistanceStrategy::BoundingBox);
        }
        chain
    }

    fn source(self) -> DistanceSource {
        match self {
            DistanceStrategy::ExactOracle => DistanceSource::ExactOracle,
            DistanceStrategy::MeshGeometry => DistanceSource::MeshGeometry,
            DistanceStrategy::BoundingBox => DistanceSource::BoundingBox,
        }
    }
}

/// Terminal plus its lazily fetched mesh. The mesh source is asked at
/// most once per terminal, and only if some pair needs the geometry.
pub struct TerminalGeometry<'t> {
    terminal: &'t Terminal,
    fetched: OnceLock<Result<Mesh, String>>,
}

impl<'t> TerminalGeometry<'t> {
    pub fn new(terminal: &'t Terminal) -> Self {
        Self {
            terminal,
            fetched: OnceLock::new(),
        }
    }

    pub fn terminal(&self) -> &'t Terminal {
        self.terminal
    }

    fn mesh(&self, source: Option<&dyn MeshSource>) -> Result<&Mesh, String> {
        if let Some(mesh) = &self.terminal.mesh {
            return Ok(mesh);
        }
        let fetched = self.fetched.get_or_init(|| {
            let part_ref = self
                .terminal
                .part_ref
                .as_deref()
                .ok_or_else(|| format!("no geometry for terminal '{}'", self.terminal.id))?;
            let source = source.ok_or_else(|| {
                format!("no geometry for terminal '{}' and no mesh source configured", self.terminal.id)
            })?;
            tracing::debug!("Fetching mesh for terminal '{}' ({})", self.terminal.id, part_ref);
            source
                .fetch_mesh(part_ref)
                .map_err(|e| format!("mesh for terminal '{}': {}", self.terminal.id, e))
        });
        fetched.as_ref().map_err(Clone::clone)
    }

    fn bounds(&self, source: Option<&dyn MeshSource>) -> Option<BoundingBox> {
        self.terminal
            .bounds
            .or_else(|| self.mesh(source).ok().and_then(Mesh::bounding_box))
    }
}

/// Borrowed collaborators for one run
#[derive(Clone, Copy)]
pub struct PairCheckContext<'a> {
    pub lookup: &'a StandardsLookup,
    pub engine: &'a GeometryDistanceEngine,
    pub oracle: Option<&'a dyn DistanceOracle>,
    pub mesh_source: Option<&'a dyn MeshSource>,
    pub options: &'a AnalysisOptions,
    pub strategies: &'a [DistanceStrategy],
}

/// Insulation class governing a pair: the override, else the stricter of the two
pub fn pair_insulation_class(a: &Terminal, b: &Terminal, options: &AnalysisOptions) -> InsulationClass {
    options.insulation_class_override.unwrap_or_else(|| {
        let default = options.default_insulation_class;
        a.insulation_class
            .unwrap_or(default)
            .max(b.insulation_class.unwrap_or(default))
    })
}

/// Try the strategies in order; returns the distance in mm and its source,
/// or the notes of every failed attempt
pub fn measure_pair(
    ctx: &PairCheckContext<'_>,
    a: &TerminalGeometry<'_>,
    b: &TerminalGeometry<'_>,
) -> Result<(f64, DistanceSource), Vec<String>> {
    let mut notes = Vec::new();

    for &strategy in ctx.strategies {
        let attempt = match strategy {
            DistanceStrategy::ExactOracle => exact_distance_m(ctx, a.terminal(), b.terminal()),
            DistanceStrategy::MeshGeometry => match (a.mesh(ctx.mesh_source), b.mesh(ctx.mesh_source)) {
                (Ok(mesh_a), Ok(mesh_b)) => ctx
                    .engine
                    .minimum_distance(mesh_a, mesh_b)
                    .map_err(|e| format!("mesh distance failed: {}", e)),
                (Err(ea), Err(eb)) => Err(format!("{}; {}", ea, eb)),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            DistanceStrategy::BoundingBox => match (a.bounds(ctx.mesh_source), b.bounds(ctx.mesh_source)) {
                (Some(ba), Some(bb)) => Ok(ba.distance(&bb)),
                _ => Err("no bounding box for one or both terminals".to_string()),
            },
        };

        match attempt {
            Ok(distance_m) => return Ok((distance_m * MM_PER_M, strategy.source())),
            Err(note) => {
                tracing::debug!(
                    "{:?} unavailable for {} / {}: {}",
                    strategy,
                    a.terminal().id,
                    b.terminal().id,
                    note
                );
                notes.push(note);
            }
        }
    }

    Err(notes)
}

fn exact_distance_m(ctx: &PairCheckContext<'_>, a: &Terminal, b: &Terminal) -> Result<f64, String> {
    let oracle = ctx.oracle.ok_or_else(|| "no exact-distance oracle configured".to_string())?;
    let (part_a, part_b) = match (a.part_ref.as_deref(), b.part_ref.as_deref()) {
        (Some(pa), Some(pb)) => (pa, pb),
        _ => return Err("exact distance needs a part reference on both terminals".to_string()),
    };

    let distance = oracle
        .measure(part_a, part_b)
        .map_err(|e| format!("exact distance unavailable: {}", e))?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(format!("exact distance unavailable: oracle returned {}", distance));
    }
    Ok(distance)
}

/// Build the complete ClearancePair for one terminal pair
pub fn check_pair(
    ctx: &PairCheckContext<'_>,
    a: &TerminalGeometry<'_>,
    b: &TerminalGeometry<'_>,
    required_override_mm: Option<f64>,
) -> Result<ClearancePair, ConfigurationError> {
    let (ta, tb) = (a.terminal(), b.terminal());
    let voltage = ta.voltage.max(tb.voltage);
    let current = ta.current.max(tb.current);
    let insulation_class = pair_insulation_class(ta, tb, ctx.options);

    let (required_clearance_mm, clearances_by_standard, requirement) = match required_override_mm {
        Some(mm) => (mm, IndexMap::new(), format!("Required clearance override: {:.2}mm", mm)),
        None => {
            let standards: Vec<&str> = ctx.options.standards.iter().map(String::as_str).collect();
            let req = ctx
                .lookup
                .required_clearance_mm(voltage, current, insulation_class, &standards)?;
            let description = req.description();
            (req.worst_case_mm, req.by_standard, description)
        }
    };

    let (distance_mm, distance_source, reason) = match measure_pair(ctx, a, b) {
        Ok((mm, source)) => (Some(mm), Some(source), None),
        Err(notes) => {
            let reason = if notes.is_empty() {
                "no distance strategy configured".to_string()
            } else {
                notes.join("; ")
            };
            tracing::warn!("Pair {} / {} is inconclusive: {}", ta.id, tb.id, reason);
            (None, None, Some(reason))
        }
    };

    let (verdict, margin_mm) = ClearancePair::evaluate(required_clearance_mm, distance_mm);

    Ok(ClearancePair {
        terminal_a: ta.id.clone(),
        terminal_b: tb.id.clone(),
        voltage,
        current,
        insulation_class,
        required_clearance_mm,
        clearances_by_standard,
        requirement,
        distance_mm,
        distance_source,
        verdict,
        margin_mm,
        reason,
    })
}
