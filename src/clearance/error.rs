//! Error taxonomy for clearance verification
//!
//! Only configuration problems abort an analysis run. Geometry and
//! measurement failures are absorbed per pair into Inconclusive verdicts.

use thiserror::Error;

/// Failure reported by the exact-distance oracle. The engine never looks
/// inside it beyond its display text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    #[error("part not found: {0}")]
    NotFound(String),

    #[error("measurement timed out")]
    Timeout,

    #[error("malformed measurement response: {0}")]
    Malformed(String),

    #[error("measurement failed: {0}")]
    Failed(String),
}

/// Problems with the inputs or options of a run; fatal to the whole call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("no clearance standards selected")]
    NoStandards,

    #[error("unknown clearance standard '{0}'")]
    UnknownStandard(String),

    #[error("unknown insulation class '{0}' (expected functional, basic or reinforced)")]
    UnknownInsulationClass(String),

    #[error("terminal '{terminal}' has invalid {field}: {value}")]
    InvalidRating {
        terminal: String,
        field: &'static str,
        value: f64,
    },

    #[error("invalid voltage {0}: must be a finite, non-negative number")]
    InvalidVoltage(f64),

    #[error("invalid required clearance override {0}mm")]
    InvalidClearanceOverride(f64),

    #[error("duplicate terminal id '{0}'")]
    DuplicateTerminal(String),

    #[error("invalid concurrency limit {0}")]
    InvalidConcurrency(usize),

    #[error("standard '{standard}' table is invalid: {reason}")]
    InvalidTable { standard: String, reason: String },

    #[error("standard '{0}' is already registered")]
    DuplicateStandard(String),
}

/// Run-level failure of `analyze`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),
}
