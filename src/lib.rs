//! JSON-RPC 2.0 control interface for a running conferencing client or
//! server.
//!
//! External tools connect over TCP, send one JSON document per line, and
//! receive responses plus pushed notifications about state changes.

pub mod config;
pub mod context;
pub mod core;
pub mod handlers;
pub mod logging;
pub mod rpc;
pub mod simulation;
