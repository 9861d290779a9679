//! Clearance server - JSON-RPC over stdio around the verification entry point
//!
//! One request per line on stdin, one response per line on stdout.
//! Background analyses report back through a `clearanceComplete` notification.
//!
//! # Module Structure
//! - `protocol` - JSON-RPC request/response types
//! - `state` - Server state management
//! - `handlers` - Request handlers organized by functionality

pub mod handlers;
pub mod protocol;
pub mod state;

// Re-export key types for convenience
pub use protocol::{error_codes, ErrorResponse, Request, Response};
pub use state::{AnalysisAsyncResult, ServerState};

use handlers::*;
use std::sync::mpsc::Sender;

/// Route one request to its handler
pub fn dispatch(
    state: &mut ServerState,
    request: Request,
    tx: Option<Sender<AnalysisAsyncResult>>,
) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "SetTerminals" => handle_set_terminals(state, id, params),
        "GetTerminals" => handle_get_terminals(state, id),
        "SetExactDistances" => handle_set_exact_distances(state, id, params),
        "GetStandards" => handle_get_standards(state, id),
        "RequiredClearance" => handle_required_clearance(state, id, params),
        "AnalyzeClearances" => handle_analyze_clearances(state, id, params),
        "AnalyzeClearancesAsync" => handle_analyze_clearances_async(state, id, params, tx),
        "CancelAnalysis" => handle_cancel_analysis(state, id),
        "GetReport" => handle_get_report(state, id, params),
        "Close" => handle_close(state, id),
        _ => Response::error(id, error_codes::METHOD_NOT_FOUND, format!("Method not found: {}", method)),
    }
}

/// Parse and dispatch one input line; `None` for blank lines
pub fn handle_line(
    state: &mut ServerState,
    line: &str,
    tx: Option<Sender<AnalysisAsyncResult>>,
) -> Option<Response> {
    if line.trim().is_empty() {
        return None;
    }
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(state, request, tx),
        Err(e) => {
            tracing::warn!("Failed to parse request: {}", e);
            Response::error(None, error_codes::PARSE_ERROR, format!("Parse error: {}", e))
        }
    };
    Some(response)
}
