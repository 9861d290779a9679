//! Handler module declarations and re-exports

pub mod analysis;
pub mod standards;
pub mod terminals;

// Re-export all handlers for convenient access
pub use analysis::*;
pub use standards::*;
pub use terminals::*;
