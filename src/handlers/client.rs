//! `jamulusclient/*` methods.

use serde_json::{Value, json};

use super::string_param;
use crate::core::{ClientState, SkillLevel};
use crate::rpc::{MethodRegistry, MethodResult, Params, RpcError};

pub fn register(registry: &mut MethodRegistry, client: &ClientState) {
    let state = client.clone();
    registry.register_fn("jamulusclient/getClientInfo", move |_params| {
        Ok(Some(json!({ "connected": state.is_connected() })))
    });

    let state = client.clone();
    registry.register_fn("jamulusclient/getChannelInfo", move |_params| {
        let info = serde_json::to_value(state.channel_info())
            .map_err(|_| RpcError::internal_error())?;
        Ok(Some(info))
    });

    let state = client.clone();
    registry.register_fn("jamulusclient/setName", move |params| set_name(&state, params));

    let state = client.clone();
    registry.register_fn("jamulusclient/setSkillLevel", move |params| {
        set_skill_level(&state, params)
    });
}

fn set_name(client: &ClientState, params: &Params) -> MethodResult {
    let name = string_param(params, "name")?;
    client.set_name(name);
    Ok(Some(json!("ok")))
}

// `null` unsets the level and, unlike every other setter, answers with
// neither `result` nor `error`.
fn set_skill_level(client: &ClientState, params: &Params) -> MethodResult {
    let level = match params.get("skillLevel") {
        Some(Value::Null) => {
            client.set_skill_level(None);
            return Ok(None);
        }
        Some(Value::String(level)) => SkillLevel::parse(level).ok_or_else(|| {
            RpcError::invalid_params("skillLevel must be beginner, intermediate, expert or null")
        })?,
        _ => {
            return Err(RpcError::invalid_params(
                "skillLevel must be a string or null",
            ));
        }
    };

    client.set_skill_level(Some(level));
    Ok(Some(json!("ok")))
}
