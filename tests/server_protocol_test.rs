// End-to-end request handling of the clearance server, one JSON line at a time
use clearance_engine::server::{error_codes, handle_line, handlers::complete_async_analysis, Response, ServerState};
use std::sync::mpsc;
use std::time::Duration;

const TERMINALS: &str = r#"{"id": 1, "method": "SetTerminals", "params": {"terminals": [
    {"id": "L1", "voltage": 230.0, "current": 80.0, "part_ref": "P1", "mesh": {"vertices": [[0.0, 0.0, 0.0]]}},
    {"id": "N", "voltage": 230.0, "current": 80.0, "part_ref": "P2", "mesh": {"vertices": [[0.0025, 0.0, 0.0]]}},
    {"id": "PE", "voltage": 0.0, "insulation_class": "reinforced", "part_ref": "P3"}
]}}"#;

fn send(state: &mut ServerState, line: &str) -> Response {
    handle_line(state, &line.replace('\n', " "), None).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_session() {
        let mut state = ServerState::new();

        let loaded = send(&mut state, TERMINALS);
        assert_eq!(loaded.id, Some(serde_json::json!(1)));
        assert_eq!(loaded.result.unwrap()["pair_count"], 3);

        let distances = r#"{"id": 2, "method": "SetExactDistances", "params": {"distances": [{"part_a": "P3", "part_b": "P1", "distance_m": 0.0095}]}}"#;
        assert!(send(&mut state, distances).error.is_none());

        let report = send(&mut state, r#"{"id": 3, "method": "AnalyzeClearances", "params": {"options": {"sort_by_distance": true}}}"#)
            .result
            .unwrap();
        assert_eq!(report["summary"]["total"], 3);
        assert_eq!(report["summary"]["failed"], 1);
        assert_eq!(report["summary"]["passed"], 1);
        assert_eq!(report["summary"]["inconclusive"], 1);

        // Sorted: L1-N at 2.5mm, L1-PE at 9.5mm against 8.0mm reinforced, then the inconclusive N-PE
        assert_eq!(report["pairs"][0]["terminal_b"], "N");
        assert_eq!(report["pairs"][1]["distance_source"], "exact_oracle");
        assert_eq!(report["pairs"][1]["insulation_class"], "reinforced");
        assert_eq!(report["pairs"][2]["verdict"], "inconclusive");
        assert!(report["inconclusive"][0]["reason"].as_str().unwrap().contains("PE"));

        let failing = send(&mut state, r#"{"id": 4, "method": "GetReport", "params": {"failing_only": true}}"#)
            .result
            .unwrap();
        assert_eq!(failing["pairs"].as_array().map(Vec::len), Some(1));
        assert_eq!(failing["summary"]["total"], 3);
        assert_eq!(failing["tightest"][0]["index"], 0);
        assert_eq!(failing["tightest"][0]["terminal_b"], "N");
        assert!(failing["inconclusive"][0]["index"].is_null());
        assert_eq!(failing["options"]["sort_by_distance"], true);

        let closed = send(&mut state, r#"{"id": 5, "method": "Close"}"#);
        assert!(closed.error.is_none());
        let after = send(&mut state, r#"{"id": 6, "method": "AnalyzeClearances"}"#);
        assert_eq!(after.error.map(|e| e.code), Some(error_codes::NO_TERMINALS));
    }

    #[test]
    fn test_protocol_errors() {
        let mut state = ServerState::new();
        assert!(handle_line(&mut state, "   ", None).is_none());

        let garbled = send(&mut state, "{not json");
        assert_eq!(garbled.error.map(|e| e.code), Some(error_codes::PARSE_ERROR));

        let unknown = send(&mut state, r#"{"id": 9, "method": "Frobnicate"}"#);
        let error = unknown.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: Frobnicate");

        let bad = send(&mut state, r#"{"id": 10, "method": "RequiredClearance", "params": {"voltage": "high"}}"#);
        assert_eq!(bad.error.map(|e| e.code), Some(error_codes::INVALID_PARAMS));

        let negative = send(&mut state, r#"{"id": 11, "method": "RequiredClearance", "params": {"voltage": -5.0}}"#);
        assert_eq!(negative.error.map(|e| e.code), Some(error_codes::CONFIGURATION_ERROR));
    }

    #[test]
    fn test_required_clearance_beyond_table() {
        let mut state = ServerState::new();
        let response = send(
            &mut state,
            r#"{"id": 1, "method": "RequiredClearance", "params": {"voltage": 5000.0, "standards": ["IEC_61439_1"]}}"#,
        );
        let result = response.result.unwrap();
        // Top entry of the table, never extrapolated
        assert_eq!(result["required_clearance_mm"], 10.0);
        assert_eq!(result["description"], "Minimum clearance: 10.00mm for 5000V, 0A (per IEC 61439-1)");
    }

    #[test]
    fn test_async_analysis_round_trip() {
        let mut state = ServerState::new();
        send(&mut state, TERMINALS);

        let (tx, rx) = mpsc::channel();
        let started = handle_line(
            &mut state,
            r#"{"id": 7, "method": "AnalyzeClearancesAsync", "params": {"options": {"max_concurrency": 1}}}"#,
            Some(tx),
        )
        .unwrap();
        assert_eq!(started.result.unwrap()["status"], "started");

        let result = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        let notification = complete_async_analysis(&mut state, result).unwrap();
        assert_eq!(notification["method"], "clearanceComplete");
        assert_eq!(notification["result"]["status"], "ok");
        assert_eq!(notification["result"]["all_passed"], false);

        let report = send(&mut state, r#"{"id": 8, "method": "GetReport"}"#).result.unwrap();
        assert_eq!(report["summary"]["total"], 3);
    }

    #[test]
    fn test_cancel_when_idle() {
        let mut state = ServerState::new();
        let response = send(&mut state, r#"{"id": 1, "method": "CancelAnalysis"}"#);
        assert_eq!(response.result.unwrap()["status"], "idle");
    }
}
