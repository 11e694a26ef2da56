//! `jamulusserver/*` methods.

use serde_json::json;

use super::string_param;
use crate::core::ServerState;
use crate::rpc::{MethodRegistry, RpcError};

pub fn register(registry: &mut MethodRegistry, server: &ServerState) {
    let state = server.clone();
    registry.register_fn("jamulusserver/getServerProfile", move |_params| {
        let profile =
            serde_json::to_value(state.profile()).map_err(|_| RpcError::internal_error())?;
        Ok(Some(profile))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/setServerName", move |params| {
        state.set_name(string_param(params, "serverName")?);
        Ok(Some(json!("ok")))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/setWelcomeMessage", move |params| {
        state.set_welcome_message(string_param(params, "welcomeMessage")?);
        Ok(Some(json!("ok")))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/getRecorderStatus", move |_params| {
        let status = serde_json::to_value(state.recorder_status())
            .map_err(|_| RpcError::internal_error())?;
        Ok(Some(status))
    });

    // Recorder commands are acknowledged, not confirmed: callers poll
    // getRecorderStatus or watch recorderStateChanged for the outcome.
    let state = server.clone();
    registry.register_fn("jamulusserver/setRecordingDirectory", move |params| {
        state.set_recording_directory(string_param(params, "recordingDirectory")?);
        Ok(Some(json!("acknowledged")))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/startRecording", move |_params| {
        state.start_recording();
        Ok(Some(json!("acknowledged")))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/stopRecording", move |_params| {
        state.stop_recording();
        Ok(Some(json!("acknowledged")))
    });

    let state = server.clone();
    registry.register_fn("jamulusserver/restartRecording", move |_params| {
        state.restart_recording();
        Ok(Some(json!("acknowledged")))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServerProfile;
    use crate::rpc::{Broadcaster, ConnectionManager, Dispatcher, INVALID_PARAMS, Response};
    use serde_json::Value;
    use std::path::PathBuf;

    fn dispatcher(recording_directory: PathBuf) -> Dispatcher {
        let server = ServerState::new(
            ServerProfile {
                name: "Room".into(),
                city: "Leeds".into(),
                welcome_message: "Welcome".into(),
            },
            recording_directory,
            Broadcaster::new(ConnectionManager::new()),
        );
        let mut registry = MethodRegistry::new();
        register(&mut registry, &server);
        Dispatcher::new(registry)
    }

    fn call(dispatcher: &Dispatcher, request: Value) -> Response {
        dispatcher.dispatch(request.as_object().expect("request object"))
    }

    #[test]
    fn profile_setters_round_trip() {
        let dispatcher = dispatcher(PathBuf::new());

        let set = call(
            &dispatcher,
            json!({"id": 1, "method": "jamulusserver/setWelcomeMessage", "params": {"welcomeMessage": "No drums after 10pm"}}),
        );
        assert_eq!(set.result, Some(json!("ok")));

        let set = call(
            &dispatcher,
            json!({"id": 2, "method": "jamulusserver/setServerName", "params": {"serverName": "Studio B"}}),
        );
        assert_eq!(set.result, Some(json!("ok")));

        let profile = call(&dispatcher, json!({"id": 3, "method": "jamulusserver/getServerProfile"}));
        assert_eq!(
            profile.result,
            Some(json!({"name": "Studio B", "city": "Leeds", "welcomeMessage": "No drums after 10pm"}))
        );
    }

    #[test]
    fn setters_validate_field_type() {
        let dispatcher = dispatcher(PathBuf::new());

        let response = call(
            &dispatcher,
            json!({"id": 1, "method": "jamulusserver/setServerName", "params": {"serverName": null}}),
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("serverName"));
    }

    #[test]
    fn recorder_commands_are_acknowledged() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path().to_path_buf());

        let start = call(&dispatcher, json!({"id": 1, "method": "jamulusserver/startRecording"}));
        assert_eq!(start.result, Some(json!("acknowledged")));

        let status = call(&dispatcher, json!({"id": 2, "method": "jamulusserver/getRecorderStatus"}));
        let status = status.result.unwrap();
        assert_eq!(status["initialised"], json!(true));
        assert_eq!(status["enabled"], json!(true));
        assert_eq!(status["errorMessage"], Value::Null);
        assert!(status["sessionStartedAt"].is_string());

        let stop = call(&dispatcher, json!({"id": 3, "method": "jamulusserver/stopRecording"}));
        assert_eq!(stop.result, Some(json!("acknowledged")));
    }

    #[test]
    fn getter_is_idempotent() {
        let dispatcher = dispatcher(PathBuf::new());
        let first = call(&dispatcher, json!({"id": 1, "method": "jamulusserver/getRecorderStatus"}));
        let second = call(&dispatcher, json!({"id": 2, "method": "jamulusserver/getRecorderStatus"}));

        assert_eq!(
            serde_json::to_string(&first.result).unwrap(),
            serde_json::to_string(&second.result).unwrap()
        );
    }
}
