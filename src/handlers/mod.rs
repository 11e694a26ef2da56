//! RPC method handlers.
//!
//! Each domain module registers its methods with the
//! [`MethodRegistry`](crate::rpc::MethodRegistry) at startup. Handlers
//! read or mutate domain state and map it to JSON; they validate their own
//! params and report field-specific `Invalid params` errors.

pub mod client;
pub mod server;

use serde_json::json;

use crate::config::Mode;
use crate::context::AppContext;
use crate::core::{ClientState, ServerProfile, ServerState};
use crate::rpc::{MethodRegistry, Params, RpcError};

/// The domain object behind the registered methods.
#[derive(Clone)]
pub enum Domain {
    Client(ClientState),
    Server(ServerState),
}

/// Build the domain state for the configured mode and register every
/// method it exposes.
pub fn install(ctx: &AppContext, registry: &mut MethodRegistry) -> Domain {
    let config = &ctx.config;
    register_common(registry, config.mode);

    match config.mode {
        Mode::Client => {
            let state = ClientState::new(&config.client_name, ctx.broadcaster.clone());
            client::register(registry, &state);
            Domain::Client(state)
        }
        Mode::Server => {
            let profile = ServerProfile {
                name: config.server_name.clone(),
                city: config.server_city.clone(),
                welcome_message: config.welcome_message.clone(),
            };
            let state = ServerState::new(
                profile,
                config.recording_directory.clone(),
                ctx.broadcaster.clone(),
            );
            server::register(registry, &state);
            Domain::Server(state)
        }
    }
}

/// Methods available in every mode.
pub fn register_common(registry: &mut MethodRegistry, mode: Mode) {
    registry
        .register_fn("jamulus/getMode", move |_params| {
            Ok(Some(json!({ "mode": mode.as_str() })))
        })
        .register_fn("jamulus/getVersion", |_params| {
            Ok(Some(json!({ "version": env!("CARGO_PKG_VERSION") })))
        });
}

/// Fetch a required string field.
pub(crate) fn string_param<'a>(params: &'a Params, field: &str) -> Result<&'a str, RpcError> {
    params
        .get(field)
        .and_then(|value| value.as_str())
        .ok_or_else(|| RpcError::invalid_params(format!("{field} must be a string")))
}
