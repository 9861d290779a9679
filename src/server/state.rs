//! Server state management for the clearance server

use crate::clearance::{
    AnalysisError, AnalysisOptions, CancellationToken, ClearancePair, EngineConfig,
    PrecomputedDistances, StandardsLookup, Terminal,
};

/// Analysis currently running in the background
pub struct RunningAnalysis {
    pub run_id: u64,
    pub cancellation: CancellationToken,
}

/// Pairs of the last completed analysis with the options that produced them
pub struct CompletedAnalysis {
    pub options: AnalysisOptions,
    pub pairs: Vec<ClearancePair>,
}

/// In-memory state: terminals, exact distances and the last result
pub struct ServerState {
    pub terminals: Vec<Terminal>,
    pub exact_distances: PrecomputedDistances,
    pub lookup: StandardsLookup,
    pub engine_config: EngineConfig,
    pub last_analysis: Option<CompletedAnalysis>,
    pub running: Option<RunningAnalysis>,
    next_run_id: u64,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            terminals: Vec::new(),
            exact_distances: PrecomputedDistances::new(),
            lookup: StandardsLookup::iec(),
            engine_config: EngineConfig::default(),
            last_analysis: None,
            running: None,
            next_run_id: 1,
        }
    }

    /// Check if terminals are loaded
    pub fn has_terminals(&self) -> bool {
        !self.terminals.is_empty()
    }

    /// Register a background run, cancelling any run it supersedes
    pub fn start_run(&mut self) -> RunningAnalysis {
        if let Some(previous) = self.running.take() {
            previous.cancellation.cancel();
        }
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let cancellation = CancellationToken::new();
        self.running = Some(RunningAnalysis {
            run_id,
            cancellation: cancellation.clone(),
        });
        RunningAnalysis { run_id, cancellation }
    }

    /// Drop results and cancel anything in flight
    pub fn reset(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancellation.cancel();
        }
        self.terminals.clear();
        self.exact_distances = PrecomputedDistances::new();
        self.last_analysis = None;
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result from async clearance analysis
pub struct AnalysisAsyncResult {
    pub run_id: u64,
    pub options: AnalysisOptions,
    pub outcome: Result<Vec<ClearancePair>, AnalysisError>,
    pub elapsed_ms: f64,
}
