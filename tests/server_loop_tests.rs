//! Server loop behavior over in-memory streams: reply framing, clean stop
//! on end-of-stream, recovery from bad frames, and silent notifications.

use std::path::Path;

use mcp_file_bridge::config::ServerConfig;
use mcp_file_bridge::protocol::{Message, RpcId};
use mcp_file_bridge::server::BridgeServer;
use mcp_file_bridge::transport::{encode_message, Framing, MessageReader};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

fn test_config(root: &Path, framing: Framing) -> ServerConfig {
    ServerConfig {
        sandbox_root: root.to_path_buf(),
        framing,
        relay_tools: false,
    }
}

/// Feed raw frames to a server over an in-memory duplex, close the input,
/// and return everything it wrote back plus its exit result.
async fn exchange_raw(
    config: ServerConfig,
    frames: Vec<Vec<u8>>,
) -> (Vec<u8>, Result<(), String>) {
    let mut server = BridgeServer::new(config).unwrap();

    let (client_io, server_io) = tokio::io::duplex(1 << 16);
    let (server_read, server_write) = tokio::io::split(server_io);
    let (mut client_read, mut client_write) = tokio::io::split(client_io);

    let server_fut = async {
        server
            .serve(BufReader::new(server_read), server_write)
            .await
            .map_err(|e| e.to_string())
    };
    let client_fut = async move {
        for frame in frames {
            client_write.write_all(&frame).await.unwrap();
        }
        client_write.shutdown().await.unwrap();
        drop(client_write);

        let mut raw = Vec::new();
        client_read.read_to_end(&mut raw).await.unwrap();
        raw
    };

    let (server_result, raw) = tokio::join!(server_fut, client_fut);
    (raw, server_result)
}

async fn exchange(config: ServerConfig, frames: Vec<Vec<u8>>) -> (Vec<Message>, Result<(), String>) {
    let (raw, result) = exchange_raw(config, frames).await;
    let mut reader = MessageReader::new(BufReader::new(raw.as_slice()));
    let mut replies = Vec::new();
    while let Some(message) = reader.next_message().await.unwrap() {
        replies.push(message);
    }
    (replies, result)
}

fn frame(message: &Message, framing: Framing) -> Vec<u8> {
    encode_message(message, framing).unwrap()
}

#[tokio::test]
async fn requests_reply_and_notifications_stay_silent() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![
        frame(
            &Message::request(RpcId::Number(1), "initialize", Some(json!({}))),
            Framing::Header,
        ),
        // A notification, and in the other framing — same stream, no reply.
        frame(
            &Message::notification("notifications/initialized", None),
            Framing::Line,
        ),
        frame(&Message::request(RpcId::Number(2), "tools/list", None), Framing::Line),
    ];

    let (replies, result) = exchange(test_config(tmp.path(), Framing::Header), frames).await;
    result.unwrap();

    assert_eq!(replies.len(), 2, "two requests, two replies: {replies:?}");
    assert_eq!(replies[0].id(), Some(&RpcId::Number(1)));
    assert_eq!(replies[1].id(), Some(&RpcId::Number(2)));
}

#[tokio::test]
async fn empty_input_stops_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    let (replies, result) = exchange(test_config(tmp.path(), Framing::Header), vec![]).await;
    result.unwrap();
    assert!(replies.is_empty());
}

#[tokio::test]
async fn bad_frame_is_dropped_and_the_loop_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![
        b"this is not a frame\n".to_vec(),
        frame(&Message::request(RpcId::Number(1), "ping", None), Framing::Header),
    ];

    let (replies, result) = exchange(test_config(tmp.path(), Framing::Header), frames).await;
    result.unwrap();

    assert_eq!(replies.len(), 1, "the bad frame is dropped, not fatal");
    assert_eq!(replies[0].id(), Some(&RpcId::Number(1)));
}

#[tokio::test]
async fn wrong_protocol_version_is_rejected_per_request() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![
        b"{\"jsonrpc\":\"1.0\",\"id\":1,\"method\":\"ping\"}\n".to_vec(),
        frame(&Message::request(RpcId::Number(2), "ping", None), Framing::Header),
    ];

    let (replies, result) = exchange(test_config(tmp.path(), Framing::Header), frames).await;
    result.unwrap();

    assert_eq!(replies.len(), 2);
    match &replies[0] {
        Message::Error(e) => assert_eq!(e.error.code, -32600),
        other => panic!("expected invalid-request error, got {other:?}"),
    }
    assert!(matches!(&replies[1], Message::Response(_)));
}

#[tokio::test]
async fn replies_use_the_configured_header_framing() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![frame(
        &Message::request(RpcId::Number(1), "ping", None),
        Framing::Line,
    )];

    let (raw, result) = exchange_raw(test_config(tmp.path(), Framing::Header), frames).await;
    result.unwrap();
    assert!(
        raw.starts_with(b"Content-Length: "),
        "got {:?}",
        String::from_utf8_lossy(&raw)
    );
}

#[tokio::test]
async fn replies_use_the_configured_line_framing() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![frame(
        &Message::request(RpcId::Number(1), "ping", None),
        Framing::Header,
    )];

    let (raw, result) = exchange_raw(test_config(tmp.path(), Framing::Line), frames).await;
    result.unwrap();
    assert!(raw.starts_with(b"{"), "got {:?}", String::from_utf8_lossy(&raw));
    assert_eq!(raw.last(), Some(&b'\n'));
}

#[tokio::test]
async fn stray_response_on_input_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = vec![
        frame(&Message::success(RpcId::Number(9), json!({})), Framing::Line),
        frame(&Message::request(RpcId::Number(1), "ping", None), Framing::Header),
    ];

    let (replies, result) = exchange(test_config(tmp.path(), Framing::Header), frames).await;
    result.unwrap();

    assert_eq!(replies.len(), 1, "stray responses produce no reply");
    assert_eq!(replies[0].id(), Some(&RpcId::Number(1)));
}
