//! Request dispatch.
//!
//! Turns one inbound frame into exactly one outbound document: a single
//! response object, or an array of responses for a batch. Every frame is
//! answered, including malformed ones and empty batches.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, trace};

use super::message::{Message, classify};
use super::methods::{MethodRegistry, RpcMethod};
use super::protocol::{MethodResult, Params, Response, RpcError};

/// The document written back for one inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Single(Response),
    Batch(Vec<Response>),
}

/// Resolves requests against a frozen [`MethodRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
}

impl Dispatcher {
    /// Take ownership of a fully populated registry. No further
    /// registrations are possible afterwards.
    pub fn new(registry: MethodRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Classify a raw frame and produce its reply.
    pub fn handle_frame(&self, frame: &[u8]) -> Reply {
        match classify(frame) {
            Message::Malformed(reason) => {
                debug!(error = %reason, "Parse error");
                Reply::Single(Response::parse_error())
            }
            Message::NotAnEnvelope => Reply::Single(Response::invalid_request(Value::Null)),
            Message::Single(request) => Reply::Single(self.dispatch(&request)),
            Message::Batch(items) if items.is_empty() => {
                debug!("Empty batch");
                Reply::Single(Response::invalid_request(Value::Null))
            }
            Message::Batch(items) => {
                trace!(size = items.len(), "Batch received");
                Reply::Batch(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::Object(request) => self.dispatch(request),
                            _ => Response::invalid_request(Value::Null),
                        })
                        .collect(),
                )
            }
        }
    }

    /// Run a single request object through the registry.
    pub fn dispatch(&self, request: &Map<String, Value>) -> Response {
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            debug!(id = %id, "Request without a string method");
            return Response::invalid_request(id);
        };

        let Some(handler) = self.registry.get(method) else {
            debug!(method, "Method not found");
            return Response::error(id, RpcError::method_not_found());
        };

        let empty = Params::new();
        let (params, params_error) = match request.get("params") {
            None => (&empty, None),
            Some(Value::Object(params)) => (params, None),
            Some(_) => (&empty, Some(RpcError::invalid_params("not an object"))),
        };

        trace!(method, id = %id, "Dispatching");
        let outcome = match (invoke(handler.as_ref(), method, params), params_error) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(params_error)) => Err(params_error),
            (outcome, None) => outcome,
        };

        Response::from_outcome(id, outcome)
    }
}

/// Call a handler, converting a panic into an internal error.
fn invoke(handler: &dyn RpcMethod, method: &str, params: &Params) -> MethodResult {
    match catch_unwind(AssertUnwindSafe(|| handler.call(params))) {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(method, "RPC handler panicked");
            Err(RpcError::internal_error())
        }
    }
}
