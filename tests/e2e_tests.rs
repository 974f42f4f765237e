
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use test_helpers::{start_test_server, test_server};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/");
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), connect_async(&url))
        .await
        .expect("connect timed out")
        .expect("failed to connect");
    stream
}

async fn send(client: &mut Client, opcode: &str, args: Vec<Value>) {
    let mut frame = vec![Value::String(opcode.to_string())];
    frame.extend(args);
    let text = serde_json::to_string(&frame).unwrap();
    client.send(Message::Text(text.into())).await.unwrap();
}

async fn join(client: &mut Client, user_name: &str) {
    send(
        client,
        "13",
        vec![json!({
            "userName": user_name,
            "guest": false,
            "level": "5",
            "avatar": null,
            "roomPassword": null,
        })],
    )
    .await;
}

/// Reads frames until one whose opcode matches `opcode`, or panics after a
/// few attempts. Several opcodes can arrive in between (e.g. `3` before `4`).
async fn recv_opcode(client: &mut Client, opcode: &str) -> Vec<Value> {
    for _ in 0..10 {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream closed")
            .expect("websocket error");
        let Message::Text(text) = msg else { continue };
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        if parsed.first().and_then(Value::as_str) == Some(opcode) {
            return parsed;
        }
    }
    panic!("opcode {opcode} not seen within 10 frames");
}

#[tokio::test]
async fn join_flow_assigns_host_and_broadcasts_player_joined() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;

    let inform = recv_opcode(&mut alice, "3").await;
    assert_eq!(inform[1], json!(0));

    let mut bob = connect(addr).await;
    join(&mut bob, "bob").await;

    let joined_to_alice = recv_opcode(&mut alice, "4").await;
    assert_eq!(joined_to_alice[2], json!("bob"));
}

#[tokio::test]
async fn chat_message_is_broadcast_to_room() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;
    recv_opcode(&mut alice, "3").await;

    let mut bob = connect(addr).await;
    join(&mut bob, "bob").await;
    recv_opcode(&mut bob, "3").await;
    recv_opcode(&mut alice, "4").await;

    send(&mut bob, "10", vec![json!({"msg": "hello room"})]).await;

    let chat = recv_opcode(&mut alice, "20").await;
    assert_eq!(chat[1], json!(1));
    assert_eq!(chat[2], json!("hello room"));
}

#[tokio::test]
async fn non_host_cannot_change_map() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;
    recv_opcode(&mut alice, "3").await;

    let mut bob = connect(addr).await;
    join(&mut bob, "bob").await;
    recv_opcode(&mut bob, "3").await;
    recv_opcode(&mut alice, "4").await;

    send(&mut bob, "23", vec![json!({"map": "newmap"})]).await;

    let error = recv_opcode(&mut bob, "16").await;
    assert_eq!(error[1], json!("not_hosting"));
}

#[tokio::test]
async fn host_can_change_map_and_room_broadcasts() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;
    recv_opcode(&mut alice, "3").await;

    let mut bob = connect(addr).await;
    join(&mut bob, "bob").await;
    recv_opcode(&mut bob, "3").await;
    recv_opcode(&mut alice, "4").await;

    send(&mut alice, "23", vec![json!({"map": "newmap"})]).await;

    let to_bob = recv_opcode(&mut bob, "29").await;
    assert_eq!(to_bob[1], json!("newmap"));
}

#[tokio::test]
async fn timesync_works_before_admission() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut client = connect(addr).await;
    send(&mut client, "18", vec![json!({"id": 42})]).await;

    let reply = recv_opcode(&mut client, "23").await;
    assert_eq!(reply[1]["id"], json!(42));
    assert!(reply[1]["result"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn duplicate_username_is_rejected_with_error_frame() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;
    recv_opcode(&mut alice, "3").await;

    let mut alice2 = connect(addr).await;
    join(&mut alice2, "alice").await;

    let error = recv_opcode(&mut alice2, "16").await;
    assert_eq!(error[1], json!("already_in_this_room"));
}

#[tokio::test]
async fn room_metadata_endpoint_reports_player_count() {
    let server = test_server();
    let addr = start_test_server(server).await;

    let mut alice = connect(addr).await;
    join(&mut alice, "alice").await;
    recv_opcode(&mut alice, "3").await;

    let body = reqwest_like_get(addr).await;
    assert_eq!(body["players"], json!(1));
}

/// A tiny hand-rolled HTTP GET since this crate has no HTTP client
/// dependency; good enough to read the plaintext `/` metadata response.
async fn reqwest_like_get(addr: SocketAddr) -> Value {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET / HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    serde_json::from_str(body).unwrap()
}
