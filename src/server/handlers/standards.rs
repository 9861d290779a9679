//! Standards operations: GetStandards, RequiredClearance

use crate::clearance::InsulationClass;
use crate::server::protocol::{error_codes, parse_params, Response};
use crate::server::state::ServerState;
use serde::Deserialize;

/// Handle GetStandards request - returns every registered table
pub fn handle_get_standards(state: &ServerState, id: Option<serde_json::Value>) -> Response {
    let tables: Vec<_> = state.lookup.tables().collect();
    Response::from_serializable(id, &tables)
}

/// Handle RequiredClearance request - direct lookup without geometry
pub fn handle_required_clearance(
    state: &ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct RequiredClearanceParams {
        voltage: f64,
        #[serde(default)]
        current: f64,
        #[serde(default)]
        insulation_class: InsulationClass,
        #[serde(default)]
        standards: Option<Vec<String>>,
    }

    let params: RequiredClearanceParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                format!("{:#} (expected {{voltage: number, current?, insulation_class?, standards?}})", e));
        }
    };

    let standards = params.standards.unwrap_or_else(|| state.lookup.names());
    match state
        .lookup
        .required_clearance_mm(params.voltage, params.current, params.insulation_class, &standards)
    {
        Ok(requirement) => {
            let description = requirement.description();
            Response::success(id, serde_json::json!({
                "required_clearance_mm": requirement.worst_case_mm,
                "clearances_by_standard": requirement.by_standard,
                "insulation_class": requirement.insulation_class,
                "description": description,
            }))
        }
        Err(e) => Response::error(id, error_codes::CONFIGURATION_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_clearance_defaults_to_all_standards() {
        let state = ServerState::new();
        let response = handle_required_clearance(&state, None, Some(serde_json::json!({"voltage": 230.0, "current": 80.0})));
        let result = response.result.unwrap();
        assert_eq!(result["required_clearance_mm"], 4.0);
        assert_eq!(result["clearances_by_standard"]["IEC 61439-1"], 3.0);
        assert_eq!(
            result["description"],
            "Minimum clearance: 4.00mm for 230V, 80A (worst case of: IEC 61010-1: 4.00mm, IEC 61439-1: 3.00mm)"
        );
    }

    #[test]
    fn test_required_clearance_unknown_standard() {
        let state = ServerState::new();
        let params = serde_json::json!({"voltage": 230.0, "standards": ["UL 840"]});
        let response = handle_required_clearance(&state, None, Some(params));
        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::CONFIGURATION_ERROR);
        assert!(error.message.contains("UL 840"));
    }

    #[test]
    fn test_get_standards_lists_tables() {
        let state = ServerState::new();
        let result = handle_get_standards(&state, None).result.unwrap();
        assert_eq!(result.as_array().map(Vec::len), Some(2));
        assert_eq!(result[0]["name"], "IEC 61010-1");
    }
}
