mod support;

use std::time::Duration;

use jamrpc::config::{AppConfig, Mode};
use jamrpc::context::AppContext;
use jamrpc::handlers::{self, Domain};
use jamrpc::rpc::{INVALID_PARAMS, MethodRegistry, RpcClient};
use serde_json::{Value, json};
use support::{Peer, TestServer, start_server_with, wait_for_connections};
use tokio::time::timeout;

async fn start_domain(mode: Mode) -> (TestServer, Domain) {
    let ctx = AppContext::new(AppConfig {
        mode,
        client_name: "guitar".into(),
        server_name: "Rehearsal Room".into(),
        ..AppConfig::default()
    });
    let mut registry = MethodRegistry::new();
    let domain = handlers::install(&ctx, &mut registry);

    let server = start_server_with(
        registry,
        ctx.connections.clone(),
        ctx.config.transport_limits(),
    )
    .await;
    (server, domain)
}

#[tokio::test]
async fn test_set_name_visible_in_channel_info() {
    let (server, _domain) = start_domain(Mode::Client).await;
    let mut peer = Peer::connect(server.addr).await;

    let set = peer
        .call(r#"{"jsonrpc":"2.0","id":1,"method":"jamulusclient/setName","params":{"name":"bass"}}"#)
        .await;
    assert_eq!(set["result"], json!("ok"));

    let info = peer
        .call(r#"{"jsonrpc":"2.0","id":2,"method":"jamulusclient/getChannelInfo","params":{}}"#)
        .await;
    assert_eq!(info["result"]["name"], json!("bass"));
    assert_eq!(info["id"], json!(2));
}

#[tokio::test]
async fn test_invalid_params_names_field() {
    let (server, _domain) = start_domain(Mode::Client).await;
    let mut peer = Peer::connect(server.addr).await;

    let response = peer
        .call(r#"{"id":1,"method":"jamulusclient/setName","params":{"name":7}}"#)
        .await;
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    assert!(
        response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("name")
    );
}

#[tokio::test]
async fn test_getter_is_idempotent() {
    let (server, _domain) = start_domain(Mode::Server).await;
    let mut peer = Peer::connect(server.addr).await;
    let request = r#"{"id":1,"method":"jamulusserver/getServerProfile"}"#;

    peer.send(request).await;
    let first = peer.recv_line().await;
    peer.send(request).await;
    let second = peer.recv_line().await;

    assert_eq!(first, second);
    let profile: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(profile["result"]["name"], json!("Rehearsal Room"));
}

#[tokio::test]
async fn test_domain_event_reaches_subscriber() {
    let (server, domain) = start_domain(Mode::Client).await;
    let Domain::Client(client) = domain else {
        panic!("client mode builds client state");
    };

    let mut notifications = RpcClient::new(server.addr).subscribe().await.unwrap();
    wait_for_connections(&server.connections, 1).await;

    client.set_connected(true);

    let notification = timeout(Duration::from_secs(2), notifications.next())
        .await
        .expect("notification in time")
        .unwrap()
        .expect("connection still open");
    assert_eq!(notification.method, "jamulusclient/connected");
}

#[tokio::test]
async fn test_recorder_command_is_acknowledged() {
    let (server, _domain) = start_domain(Mode::Server).await;
    let mut peer = Peer::connect(server.addr).await;

    let response = peer
        .call(r#"{"id":1,"method":"jamulusserver/startRecording"}"#)
        .await;
    assert_eq!(response["result"], json!("acknowledged"));

    // No recording directory is configured, so nothing was started.
    let status = peer
        .call(r#"{"id":2,"method":"jamulusserver/getRecorderStatus"}"#)
        .await;
    assert_eq!(status["result"]["enabled"], json!(false));
    assert_eq!(status["result"]["initialised"], json!(false));
}

#[tokio::test]
async fn test_mode_and_version_via_client() {
    let (server, _domain) = start_domain(Mode::Server).await;
    let client = RpcClient::new(server.addr);

    let mode: Value = client.call_no_params("jamulus/getMode").await.unwrap();
    assert_eq!(mode, json!({"mode": "server"}));

    let version: Value = client.call_no_params("jamulus/getVersion").await.unwrap();
    assert_eq!(version["version"], json!(env!("CARGO_PKG_VERSION")));
}
