//! End-to-end exercises over a real subprocess: the client correlator
//! against the actual server binary, including the timeout path and the
//! bounded shutdown sequence.

use std::path::Path;
use std::time::Duration;

use mcp_file_bridge::client::{BridgeClient, ClientError, Reply};
use serde_json::{json, Value};

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

fn server_exe() -> &'static str {
    env!("CARGO_BIN_EXE_mcp-file-bridge")
}

fn no_args() -> std::iter::Empty<&'static str> {
    std::iter::empty()
}

fn server_envs(sandbox: &Path, relay: bool) -> Vec<(String, String)> {
    let mut envs = vec![(
        "FILEBRIDGE_SANDBOX_ROOT".to_string(),
        sandbox.display().to_string(),
    )];
    if relay {
        envs.push(("FILEBRIDGE_RELAY_TOOLS".to_string(), "1".to_string()));
    }
    envs
}

#[tokio::test]
async fn handshake_and_file_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), false)).unwrap();

    let info = client.initialize(CALL_TIMEOUT).await.unwrap();
    assert_eq!(
        info.pointer("/serverInfo/name").and_then(Value::as_str),
        Some("mcp-file-bridge")
    );

    let write = client
        .call_tool(
            "write_file",
            json!({ "filename": "a.txt", "content": "hi" }),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(!write.is_error, "{:?}", write.content);

    let read = client
        .call_tool("read_file", json!({ "filename": "a.txt" }), CALL_TIMEOUT)
        .await
        .unwrap();
    assert!(!read.is_error);
    assert_eq!(read.content[0].text, "hi");

    let status = client.shutdown().await.unwrap();
    assert!(status.success(), "server should exit cleanly on stdin close");
}

#[tokio::test]
async fn list_files_reflects_writes() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), false)).unwrap();
    client.initialize(CALL_TIMEOUT).await.unwrap();

    let empty = client
        .call_tool("list_files", json!({}), CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(empty.content[0].text, "No files in sandbox directory yet");

    client
        .call_tool(
            "write_file",
            json!({ "filename": "only.txt", "content": "x" }),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();

    let listed = client
        .call_tool("list_files", json!({}), CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(listed.content[0].text, "Files in sandbox:\n- only.txt");

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn escape_attempt_is_refused_and_server_survives() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), false)).unwrap();
    client.initialize(CALL_TIMEOUT).await.unwrap();

    let refused = client
        .call_tool(
            "write_file",
            json!({ "filename": "../../etc/passwd", "content": "owned" }),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(refused.is_error, "escape must come back as a tool error");

    // The refusal is tool-level; the server keeps serving.
    let listed = client
        .call_tool("list_files", json!({}), CALL_TIMEOUT)
        .await
        .unwrap();
    assert!(!listed.is_error);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_method_surfaces_as_rpc_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), false)).unwrap();
    client.initialize(CALL_TIMEOUT).await.unwrap();

    let reply = client.call("foo/bar", None, CALL_TIMEOUT).await.unwrap();
    match reply {
        Reply::Error(e) => assert_eq!(e.code, -32601),
        Reply::Result(v) => panic!("expected method-not-found, got {v:?}"),
    }

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn tools_list_matches_the_relay_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), true)).unwrap();
    client.initialize(CALL_TIMEOUT).await.unwrap();

    let tools = client
        .call("tools/list", None, CALL_TIMEOUT)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let names: Vec<&str> = tools["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"relay_write"));
    assert!(names.contains(&"relay_read"));
    assert!(names.contains(&"relay_status"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn relay_mailbox_works_over_subprocess() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client =
        BridgeClient::spawn(server_exe(), no_args(), &server_envs(tmp.path(), true)).unwrap();
    client.initialize(CALL_TIMEOUT).await.unwrap();

    let queued = client
        .call_tool(
            "relay_write",
            json!({ "message": "ping from test" }),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(!queued.is_error, "{:?}", queued.content);

    // The mailbox is an ordinary sandbox file, so read_file can see it.
    let mailbox = client
        .call_tool(
            "read_file",
            json!({ "filename": "RELAY_INPUT.TXT" }),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(mailbox.content[0].text.contains("ping from test"));

    let status = client
        .call_tool("relay_status", json!({}), CALL_TIMEOUT)
        .await
        .unwrap();
    assert!(status.content[0].text.contains("Exists: true"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn timeout_returns_error_and_clears_pending_state() {
    // `cat` echoes our own request back — a message whose id matches but
    // which is not a response, so the correlator discards it and times out.
    let mut client = BridgeClient::spawn("cat", no_args(), &[]).unwrap();

    let err = client
        .call("tools/list", None, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout { id: 1, .. }), "got {err:?}");
    assert!(
        client.pending_call().is_none(),
        "pending state must not leak across calls"
    );

    // Ids keep climbing; the next call correlates on its own id.
    let err = client
        .call("ping", None, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout { id: 2, .. }), "got {err:?}");
    assert!(client.pending_call().is_none());

    let status = client.shutdown().await.unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn server_exit_shows_up_as_closed_connection() {
    // `true` exits immediately, closing its stdout before any reply.
    let mut client = BridgeClient::spawn("true", no_args(), &[]).unwrap();

    let err = client
        .call("tools/list", None, CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::Closed { .. } | ClientError::Io(_)),
        "got {err:?}"
    );

    client.shutdown().await.unwrap();
}
