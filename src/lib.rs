//! Electrical clearance verification for conductive terminals
//!
//! Given terminals with voltage and current ratings and optional surface
//! geometry, computes the required air gap per IEC clearance tables,
//! measures the actual separation of every terminal pair and reports
//! Pass, Fail or Inconclusive per pair.
//!
//! # Modules
//! - `geometry` - Points, triangles, meshes and bounding boxes
//! - `clearance` - Distance engine, standards lookup, analyzer and report
//! - `server` - JSON-RPC server exposing the analysis over stdio

pub mod clearance;
pub mod geometry;
pub mod server;

pub use clearance::{
    analyze_clearances, AnalysisError, AnalysisOptions, ClearancePair, InsulationClass,
    Terminal, Verdict, VerificationContext, VerificationReport,
};
