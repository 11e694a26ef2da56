//! JSON-RPC 2.0 protocol types.
//!
//! Implements the envelope conventions of the JSON-RPC 2.0 specification
//! for requests, responses and server-initiated notifications.
//! See: https://www.jsonrpc.org/specification

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Parameters handed to a method handler. Always an object.
pub type Params = Map<String, Value>;

/// Outcome of a method handler.
///
/// `Ok(Some(value))` becomes `result`, `Err(error)` becomes `error`, and
/// `Ok(None)` produces a response carrying neither field.
pub type MethodResult = Result<Option<Value>, RpcError>;

/// JSON-RPC 2.0 request object, as sent by [`crate::rpc::RpcClient`].
///
/// The server never deserializes into this type: incoming frames are
/// classified from raw JSON so malformed envelopes can be reported
/// precisely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Must be exactly "2.0"
    pub jsonrpc: String,
    /// Method name to invoke
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier, echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }
}

/// JSON-RPC 2.0 response object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Result on success (mutually exclusive with error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure (mutually exclusive with result)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Request identifier (echoed from request, `null` when unknown)
    #[serde(default)]
    pub id: Value,
}

impl Response {
    /// Create a success response with the given result.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Build a response from a handler outcome.
    pub fn from_outcome(id: Value, outcome: MethodResult) -> Self {
        match outcome {
            Ok(result) => Self {
                jsonrpc: JSONRPC_VERSION.to_string(),
                result,
                error: None,
                id,
            },
            Err(error) => Self::error(id, error),
        }
    }

    /// Create a parse error response. The request id is unknown, so `id`
    /// is sent as `null` rather than omitted.
    pub fn parse_error() -> Self {
        Self::error(Value::Null, RpcError::parse_error())
    }

    /// Create an invalid request response.
    pub fn invalid_request(id: Value) -> Self {
        Self::error(id, RpcError::invalid_request())
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    /// Optional additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    /// Invalid params, with a message naming the offending field.
    pub fn invalid_params(details: impl AsRef<str>) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: {}", details.as_ref()))
    }

    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, "Internal error")
    }
}

/// Server-initiated JSON-RPC 2.0 notification. Carries no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}
