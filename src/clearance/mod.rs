//! Electrical clearance verification between terminals
//!
//! Looks up the required air gap from IEC clearance tables, measures the
//! actual separation (exact oracle, mesh geometry, or an opt-in box
//! estimate) and uses Rayon to check every terminal pair in parallel.
//!
//! # Submodules
//! - `error` - Configuration, measurement and run-level errors
//! - `types` - Terminals, verdicts, per-pair results and options
//! - `distance` - Closest-point and tiered mesh distance engine
//! - `standards` - Clearance tables and the worst-case lookup
//! - `sources` - Oracle and mesh source capabilities
//! - `checks` - Per-pair distance strategy chain and verdicts
//! - `runners` - Analyzer and verification entry point
//! - `report` - Report aggregation

mod error;
mod types;
mod distance;
mod standards;
mod sources;
mod checks;
mod runners;
mod report;

pub use error::{AnalysisError, ConfigurationError, MeasurementError};

pub use types::{
    AnalysisOptions, ClearancePair, DistanceSource, InsulationClass, Terminal, Verdict,
};

pub use distance::{
    closest_point_on_triangle, point_triangle_distance, triangle_distance,
    EngineConfig, GeometryDistanceEngine, MeshDistance,
    DEFAULT_DEGENERATE_EPSILON, DEFAULT_TRIANGLE_PAIR_LIMIT,
};

pub use standards::{
    canonical_standard_name, iec_61010_1, iec_61439_1,
    ClearanceRequirement, ClearanceStandardTable, StandardsLookup, TableRow, TableRows,
};

pub use sources::{DistanceOracle, MeasuredDistance, MeshSource, PrecomputedDistances};

pub use checks::DistanceStrategy;

// Re-export runner functions
pub use runners::{
    analyze_clearances,
    CancellationToken,
    PairwiseClearanceAnalyzer,
    VerificationContext,
};

pub use report::{
    InconclusivePair, MarginEntry, ReportSummary, VerificationReport, VerificationReportBuilder,
};
