//! Terminal operations: SetTerminals, GetTerminals, SetExactDistances, Close

use crate::clearance::{ConfigurationError, MeasuredDistance, PrecomputedDistances, Terminal};
use crate::server::protocol::{error_codes, parse_params, Response};
use crate::server::state::ServerState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Handle SetTerminals request - replaces the terminal set
pub fn handle_set_terminals(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct SetTerminalsParams {
        terminals: Vec<Terminal>,
    }

    let params: SetTerminalsParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                format!("{:#} (expected {{terminals: [Terminal]}})", e));
        }
    };

    if let Err(e) = validate_terminals(&params.terminals) {
        return Response::error(id, error_codes::CONFIGURATION_ERROR, e.to_string());
    }

    let with_mesh = params.terminals.iter().filter(|t| t.mesh.is_some()).count();
    tracing::info!("Loaded {} terminals ({} with inline meshes)", params.terminals.len(), with_mesh);

    state.terminals = params.terminals;
    state.last_analysis = None;

    Response::success(id, serde_json::json!({
        "status": "ok",
        "terminal_count": state.terminals.len(),
        "pair_count": pair_count(state.terminals.len()),
    }))
}

fn validate_terminals(terminals: &[Terminal]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for terminal in terminals {
        terminal.validate()?;
        if !seen.insert(terminal.id.as_str()) {
            return Err(ConfigurationError::DuplicateTerminal(terminal.id.clone()));
        }
    }
    Ok(())
}

fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Handle GetTerminals request - lists loaded terminals without geometry
pub fn handle_get_terminals(state: &ServerState, id: Option<serde_json::Value>) -> Response {
    #[derive(Serialize)]
    struct TerminalSummary<'a> {
        id: &'a str,
        name: &'a str,
        voltage: f64,
        current: f64,
        insulation_class: Option<String>,
        part_ref: Option<&'a str>,
        has_mesh: bool,
        has_bounds: bool,
    }

    let summaries: Vec<TerminalSummary> = state
        .terminals
        .iter()
        .map(|t| TerminalSummary {
            id: &t.id,
            name: t.display_name(),
            voltage: t.voltage,
            current: t.current,
            insulation_class: t.insulation_class.map(|c| c.to_string()),
            part_ref: t.part_ref.as_deref(),
            has_mesh: t.mesh.is_some(),
            has_bounds: t.bounds.is_some(),
        })
        .collect();

    Response::from_serializable(id, &summaries)
}

/// Handle SetExactDistances request - loads externally measured distances
pub fn handle_set_exact_distances(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct SetDistancesParams {
        distances: Vec<MeasuredDistance>,
        #[serde(default)]
        merge: bool,
    }

    let params: SetDistancesParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                format!("{:#} (expected {{distances: [{{part_a, part_b, distance_m}}]}})", e));
        }
    };

    let count = params.distances.len();
    if params.merge {
        for m in params.distances {
            state.exact_distances.insert(&m.part_a, &m.part_b, m.distance_m);
        }
    } else {
        state.exact_distances = params.distances.into_iter().collect::<PrecomputedDistances>();
    }

    tracing::info!("Received {} exact distances ({} pairs known)", count, state.exact_distances.len());

    Response::success(id, serde_json::json!({
        "status": "ok",
        "distance_count": state.exact_distances.len(),
    }))
}

/// Handle Close request - clears all state
pub fn handle_close(state: &mut ServerState, id: Option<serde_json::Value>) -> Response {
    state.reset();
    tracing::info!("State cleared");
    Response::success(id, serde_json::json!({"status": "ok"}))
}
