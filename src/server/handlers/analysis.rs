//! Analysis handlers: AnalyzeClearances, AnalyzeClearancesAsync, CancelAnalysis, GetReport

use crate::clearance::{
    AnalysisError, AnalysisOptions, CancellationToken, ClearancePair, EngineConfig,
    PairwiseClearanceAnalyzer, PrecomputedDistances, StandardsLookup, Terminal,
    VerificationContext, VerificationReport, VerificationReportBuilder,
};
use crate::server::protocol::{error_codes, parse_params, Response};
use crate::server::state::{AnalysisAsyncResult, CompletedAnalysis, ServerState};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Instant;

#[derive(Deserialize, Default)]
#[serde(default)]
struct AnalyzeParams {
    options: AnalysisOptions,
    engine: Option<EngineConfig>,
    tightest_limit: Option<usize>,
}

/// Owned copy of everything a run reads, so it can move to another thread
struct AnalysisJob {
    terminals: Vec<Terminal>,
    exact_distances: PrecomputedDistances,
    lookup: StandardsLookup,
    engine: EngineConfig,
    options: AnalysisOptions,
}

impl AnalysisJob {
    fn new(state: &ServerState, params: &AnalyzeParams) -> Self {
        Self {
            terminals: state.terminals.clone(),
            exact_distances: state.exact_distances.clone(),
            lookup: state.lookup.clone(),
            engine: params.engine.unwrap_or(state.engine_config),
            options: params.options.clone(),
        }
    }

    fn run(self, cancellation: CancellationToken) -> (AnalysisOptions, Result<Vec<ClearancePair>, AnalysisError>) {
        let mut ctx = VerificationContext::new()
            .with_standards(self.lookup)
            .with_engine_config(self.engine)
            .with_cancellation(cancellation);
        if !self.exact_distances.is_empty() {
            ctx = ctx.with_oracle(&self.exact_distances);
        }
        let outcome = PairwiseClearanceAnalyzer::new(&ctx, &self.options)
            .analyze(&self.terminals, self.options.required_clearance_override_mm);
        (self.options, outcome)
    }
}

fn parse_analyze_params(id: &Option<serde_json::Value>, params: Option<serde_json::Value>) -> Result<AnalyzeParams, Response> {
    parse_params(params).map_err(|e| {
        Response::error(id.clone(), error_codes::INVALID_PARAMS,
            format!("{:#} (expected {{options?: AnalysisOptions, engine?: EngineConfig}})", e))
    })
}

fn analysis_error_response(id: Option<serde_json::Value>, error: &AnalysisError) -> Response {
    let code = match error {
        AnalysisError::Configuration(_) => error_codes::CONFIGURATION_ERROR,
        AnalysisError::Cancelled => error_codes::ANALYSIS_CANCELLED,
        AnalysisError::ThreadPool(_) => error_codes::ANALYSIS_FAILED,
    };
    Response::error(id, code, error.to_string())
}

/// Report plus the options of the run that produced it
#[derive(Serialize)]
struct ReportResult<'a> {
    #[serde(flatten)]
    report: &'a VerificationReport,
    options: &'a AnalysisOptions,
}

fn build_report_response(
    id: Option<serde_json::Value>,
    analysis: &CompletedAnalysis,
    tightest_limit: Option<usize>,
    failing_only: bool,
) -> Response {
    let mut builder = VerificationReportBuilder::new(&analysis.pairs).failing_only(failing_only);
    if let Some(limit) = tightest_limit {
        builder = builder.tightest_limit(limit);
    }
    let report = builder.build();
    Response::from_serializable(id, &ReportResult { report: &report, options: &analysis.options })
}

/// Handle AnalyzeClearances request - runs the analysis and returns the report
pub fn handle_analyze_clearances(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    let params = match parse_analyze_params(&id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };

    if !state.has_terminals() {
        return Response::error(id, error_codes::NO_TERMINALS,
            "No terminals loaded. Call SetTerminals first.".to_string());
    }

    let run = state.start_run();
    let start = Instant::now();
    let (options, outcome) = AnalysisJob::new(state, &params).run(run.cancellation);
    if state.running.as_ref().map(|r| r.run_id) == Some(run.run_id) {
        state.running = None;
    }

    match outcome {
        Ok(pairs) => {
            tracing::info!("Analysis finished: {} pairs in {:.2?}", pairs.len(), start.elapsed());
            let analysis = CompletedAnalysis { options, pairs };
            let response = build_report_response(id, &analysis, params.tightest_limit, false);
            state.last_analysis = Some(analysis);
            response
        }
        Err(e) => analysis_error_response(id, &e),
    }
}

/// Handle AnalyzeClearancesAsync request - runs the analysis in a background
/// thread; the result arrives as a `clearanceComplete` notification
pub fn handle_analyze_clearances_async(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
    tx: Option<Sender<AnalysisAsyncResult>>,
) -> Response {
    let params = match parse_analyze_params(&id, params) {
        Ok(p) => p,
        Err(response) => return response,
    };

    if !state.has_terminals() {
        return Response::error(id, error_codes::NO_TERMINALS,
            "No terminals loaded. Call SetTerminals first.".to_string());
    }

    let tx = match tx {
        Some(tx) => tx,
        None => {
            return Response::error(id, error_codes::INTERNAL_ERROR,
                "Analysis channel not available".to_string());
        }
    };

    let job = AnalysisJob::new(state, &params);
    let run = state.start_run();
    let run_id = run.run_id;
    tracing::info!("Starting background analysis #{} over {} terminals", run_id, job.terminals.len());

    thread::spawn(move || {
        let start = Instant::now();
        let (options, outcome) = job.run(run.cancellation);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let _ = tx.send(AnalysisAsyncResult { run_id, options, outcome, elapsed_ms });
    });

    Response::success(id, serde_json::json!({
        "status": "started",
        "run_id": run_id,
        "message": "Clearance analysis running in background",
    }))
}

/// Store a finished background run and build its `clearanceComplete` notification.
/// Results of superseded runs are dropped.
pub fn complete_async_analysis(state: &mut ServerState, result: AnalysisAsyncResult) -> Option<serde_json::Value> {
    let current = state.running.as_ref().map(|r| r.run_id);
    if current != Some(result.run_id) {
        tracing::debug!("Dropping result of superseded analysis #{}", result.run_id);
        return None;
    }
    state.running = None;

    let outcome = match result.outcome {
        Ok(pairs) => {
            let report = VerificationReportBuilder::new(&pairs).build();
            tracing::info!(
                "Async analysis #{} completed: {} passed, {} failed, {} inconclusive in {:.2}ms",
                result.run_id,
                report.summary.passed,
                report.summary.failed,
                report.summary.inconclusive,
                result.elapsed_ms
            );
            let status = serde_json::json!({
                "status": "ok",
                "run_id": result.run_id,
                "elapsed_ms": result.elapsed_ms,
                "summary": report.summary,
                "all_passed": report.all_passed(),
            });
            state.last_analysis = Some(CompletedAnalysis { options: result.options, pairs });
            status
        }
        Err(e) => {
            tracing::warn!("Async analysis #{} ended: {}", result.run_id, e);
            serde_json::json!({
                "status": if e == AnalysisError::Cancelled { "cancelled" } else { "error" },
                "run_id": result.run_id,
                "elapsed_ms": result.elapsed_ms,
                "message": e.to_string(),
            })
        }
    };

    Some(serde_json::json!({
        "id": null,
        "method": "clearanceComplete",
        "result": outcome,
    }))
}

/// Block until the in-flight background run reports back, returning its
/// notification. Used on shutdown so a finished run is not lost at EOF.
pub fn wait_for_running_analysis(
    state: &mut ServerState,
    rx: &Receiver<AnalysisAsyncResult>,
) -> Vec<serde_json::Value> {
    let mut notifications = Vec::new();
    while state.running.is_some() {
        match rx.recv() {
            Ok(result) => notifications.extend(complete_async_analysis(state, result)),
            Err(_) => {
                tracing::warn!("Analysis channel closed with a run still in flight");
                state.running = None;
            }
        }
    }
    notifications
}

/// Handle CancelAnalysis request - cancels the in-flight background run
pub fn handle_cancel_analysis(state: &mut ServerState, id: Option<serde_json::Value>) -> Response {
    match &state.running {
        Some(running) => {
            running.cancellation.cancel();
            tracing::info!("Cancellation requested for analysis #{}", running.run_id);
            Response::success(id, serde_json::json!({"status": "cancelling", "run_id": running.run_id}))
        }
        None => Response::success(id, serde_json::json!({"status": "idle"})),
    }
}

/// Handle GetReport request - returns the report of the last completed run
pub fn handle_get_report(
    state: &ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct GetReportParams {
        failing_only: bool,
        tightest_limit: Option<usize>,
    }

    let params: GetReportParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                format!("{:#} (expected {{failing_only?: bool, tightest_limit?: number}})", e));
        }
    };

    match &state.last_analysis {
        Some(analysis) => build_report_response(id, analysis, params.tightest_limit, params.failing_only),
        None => Response::error(id, error_codes::NO_REPORT,
            "No analysis has completed yet. Call AnalyzeClearances first.".to_string()),
    }
}
