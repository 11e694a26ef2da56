//! Classification of decoded frames into JSON-RPC message shapes.

use serde_json::{Map, Value};

/// What a single inbound frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A single request object.
    Single(Map<String, Value>),
    /// A batch. Elements are not yet validated; each may or may not be
    /// an object.
    Batch(Vec<Value>),
    /// Valid JSON that is neither an object nor an array.
    NotAnEnvelope,
    /// The frame is not valid JSON (or not valid UTF-8).
    Malformed(String),
}

/// Parse one frame and sort it into a [`Message`].
pub fn classify(frame: &[u8]) -> Message {
    match serde_json::from_slice::<Value>(frame) {
        Ok(Value::Object(object)) => Message::Single(object),
        Ok(Value::Array(items)) => Message::Batch(items),
        Ok(_) => Message::NotAnEnvelope,
        Err(e) => Message::Malformed(e.to_string()),
    }
}
