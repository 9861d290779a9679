//! Clearance runner functions
//!
//! Contains the entry points for verifying a terminal set:
//! - `PairwiseClearanceAnalyzer::analyze` producing one ClearancePair per pair
//! - `analyze_clearances` wrapping the analyzer output in a report

use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::checks::{self, DistanceStrategy, PairCheckContext, TerminalGeometry};
use super::distance::{EngineConfig, GeometryDistanceEngine};
use super::error::{AnalysisError, ConfigurationError};
use super::report::{VerificationReport, VerificationReportBuilder};
use super::sources::{DistanceOracle, MeshSource};
use super::standards::StandardsLookup;
use super::types::{AnalysisOptions, ClearancePair, Terminal};

/// Shared flag for aborting an in-flight run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one verification run needs, owned by the caller
pub struct VerificationContext<'a> {
    lookup: StandardsLookup,
    engine: GeometryDistanceEngine,
    oracle: Option<&'a dyn DistanceOracle>,
    mesh_source: Option<&'a dyn MeshSource>,
    cancellation: CancellationToken,
}

impl Default for VerificationContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> VerificationContext<'a> {
    /// IEC tables, default engine settings, no collaborators
    pub fn new() -> Self {
        Self {
            lookup: StandardsLookup::iec(),
            engine: GeometryDistanceEngine::default(),
            oracle: None,
            mesh_source: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_standards(mut self, lookup: StandardsLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine = GeometryDistanceEngine::new(config);
        self
    }

    pub fn with_oracle(mut self, oracle: &'a dyn DistanceOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_mesh_source(mut self, source: &'a dyn MeshSource) -> Self {
        self.mesh_source = Some(source);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn lookup(&self) -> &StandardsLookup {
        &self.lookup
    }

    pub fn engine(&self) -> &GeometryDistanceEngine {
        &self.engine
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Checks every unordered terminal pair against the configured standards
pub struct PairwiseClearanceAnalyzer<'c, 'a> {
    ctx: &'c VerificationContext<'a>,
    options: &'c AnalysisOptions,
}

impl<'c, 'a> PairwiseClearanceAnalyzer<'c, 'a> {
    pub fn new(ctx: &'c VerificationContext<'a>, options: &'c AnalysisOptions) -> Self {
        Self { ctx, options }
    }

    /// One ClearancePair per pair (i < j), in input order unless
    /// `sort_by_distance` is set. Cancellation discards every pair.
    pub fn analyze(
        &self,
        terminals: &[Terminal],
        required_clearance_override_mm: Option<f64>,
    ) -> Result<Vec<ClearancePair>, AnalysisError> {
        let start = std::time::Instant::now();
        self.validate(terminals, required_clearance_override_mm)?;

        let geometries: Vec<TerminalGeometry> = terminals.iter().map(TerminalGeometry::new).collect();
        let n = geometries.len();
        let pair_indices: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();

        let strategies = DistanceStrategy::chain(self.options.allow_bounding_box_estimate);
        let check_ctx = PairCheckContext {
            lookup: &self.ctx.lookup,
            engine: &self.ctx.engine,
            oracle: self.ctx.oracle,
            mesh_source: self.ctx.mesh_source,
            options: self.options,
            strategies: &strategies,
        };
        let cancellation = &self.ctx.cancellation;

        tracing::info!(
            "Analyzing {} terminal pairs ({} terminals, strategies {:?})",
            pair_indices.len(),
            n,
            strategies
        );

        // Indexed collect keeps pair-generation order whatever the completion order
        let run = || -> Result<Vec<ClearancePair>, AnalysisError> {
            pair_indices
                .par_iter()
                .map(|&(i, j)| {
                    if cancellation.is_cancelled() {
                        return Err(AnalysisError::Cancelled);
                    }
                    checks::check_pair(&check_ctx, &geometries[i], &geometries[j], required_clearance_override_mm)
                        .map_err(AnalysisError::from)
                })
                .collect()
        };

        let result = match self.options.max_concurrency {
            Some(limit) => rayon::ThreadPoolBuilder::new()
                .num_threads(limit)
                .build()
                .map_err(|e| AnalysisError::ThreadPool(e.to_string()))?
                .install(run),
            None => run(),
        };

        let mut pairs = match result {
            Ok(pairs) if !cancellation.is_cancelled() => pairs,
            Ok(_) | Err(AnalysisError::Cancelled) => {
                tracing::info!("Analysis cancelled after {:?}", start.elapsed());
                return Err(AnalysisError::Cancelled);
            }
            Err(e) => return Err(e),
        };

        if self.options.sort_by_distance {
            pairs.sort_by(compare_distance);
        }

        tracing::info!(
            "Clearance analysis completed: {} pairs, {} inconclusive in {:?}",
            pairs.len(),
            pairs.iter().filter(|p| !p.is_concluded()).count(),
            start.elapsed()
        );

        Ok(pairs)
    }

    fn validate(&self, terminals: &[Terminal], required_override_mm: Option<f64>) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for terminal in terminals {
            terminal.validate()?;
            if !seen.insert(terminal.id.as_str()) {
                return Err(ConfigurationError::DuplicateTerminal(terminal.id.clone()));
            }
        }

        if self.options.max_concurrency == Some(0) {
            return Err(ConfigurationError::InvalidConcurrency(0));
        }

        let standards: Vec<&str> = self.options.standards.iter().map(String::as_str).collect();
        match required_override_mm {
            Some(mm) if !mm.is_finite() || mm < 0.0 => {
                return Err(ConfigurationError::InvalidClearanceOverride(mm));
            }
            // Standards are unused with an override, but named ones must still exist
            Some(_) => {
                if let Some(unknown) = standards.iter().find(|s| self.ctx.lookup.get(s).is_none()) {
                    return Err(ConfigurationError::UnknownStandard(unknown.to_string()));
                }
            }
            None => {
                self.ctx.lookup.resolve(&standards)?;
            }
        }
        Ok(())
    }
}

/// Ascending by distance; Inconclusive pairs last, stable otherwise
fn compare_distance(a: &ClearancePair, b: &ClearancePair) -> CmpOrdering {
    match (a.distance_mm, b.distance_mm) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

/// Verification entry point: analyze every pair and build the report
pub fn analyze_clearances(
    ctx: &VerificationContext<'_>,
    terminals: &[Terminal],
    options: &AnalysisOptions,
) -> Result<VerificationReport, AnalysisError> {
    let pairs = PairwiseClearanceAnalyzer::new(ctx, options)
        .analyze(terminals, options.required_clearance_override_mm)?;
    Ok(VerificationReportBuilder::new(&pairs).build())
}
