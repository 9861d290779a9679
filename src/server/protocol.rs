//! JSON-RPC protocol types for the clearance server

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// JSON-RPC Request format
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Option<serde_json::Value>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC Response format
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// JSON-RPC Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

impl Response {
    /// Create a success response with a JSON value
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Response {
            id,
            result: None,
            error: Some(ErrorResponse { code, message }),
        }
    }

    /// Serialize a handler result, reporting failures as internal errors
    pub fn from_serializable<T: Serialize>(id: Option<serde_json::Value>, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Response::success(id, value),
            Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, format!("Failed to serialize result: {}", e)),
        }
    }
}

/// Decode request params; a missing params object decodes as `{}`
pub fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> anyhow::Result<T> {
    let value = params.unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(value).context("Invalid params")
}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Custom error codes
    pub const NO_TERMINALS: i32 = 2;
    pub const CONFIGURATION_ERROR: i32 = 3;
    pub const ANALYSIS_CANCELLED: i32 = 4;
    pub const ANALYSIS_FAILED: i32 = 5;
    pub const NO_REPORT: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_omits_result() {
        let response = Response::error(Some(serde_json::json!(7)), error_codes::INVALID_PARAMS, "bad".to_string());
        let text = serde_json::to_string(&response).unwrap();
        assert_eq!(text, r#"{"id":7,"error":{"code":-32602,"message":"bad"}}"#);
    }

    #[test]
    fn test_parse_params_defaults_to_empty_object() {
        #[derive(Debug, Deserialize)]
        struct Params {
            #[serde(default)]
            failing_only: bool,
        }
        let params: Params = parse_params(None).unwrap();
        assert!(!params.failing_only);

        let err = parse_params::<Params>(Some(serde_json::json!({"failing_only": "yes"}))).unwrap_err();
        assert!(format!("{:#}", err).starts_with("Invalid params"));
    }
}
