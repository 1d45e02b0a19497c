use std::sync::Arc;
use std::time::Duration;

use chathub::config::Settings;
use chathub::hub::Hub;
use chathub::transport::{ServerMessage, serve};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(settings: Settings) -> (String, Arc<Hub>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    let hub = Arc::new(Hub::with_settings(&settings.hub));

    tokio::spawn(serve(listener, hub.clone(), settings));

    (format!("ws://{addr}"), hub)
}

async fn send(ws: &mut Ws, value: serde_json::Value) {
    ws.send(WsMessage::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

async fn recv(ws: &mut Ws) -> ServerMessage {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Stream ended")
        .expect("Read error");
    match frame {
        WsMessage::Text(text) => {
            let text = text.as_str();
            serde_json::from_str(text).unwrap_or_else(|e| {
                panic!("Failed to deserialize ServerMessage from '{text}': {e}")
            })
        }
        other => panic!("Expected a text frame, got {other:?}"),
    }
}

async fn assert_silent(ws: &mut Ws) {
    let res = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "Expected no frame, got {res:?}");
}

#[tokio::test]
async fn chat_line_is_escaped_and_relayed_to_subscribers_only() {
    let (url, _hub) = start_server(Settings::default()).await;
    let (mut listener_ws, _) = connect_async(url.as_str()).await.expect("client A connect");
    let (mut speaker_ws, _) = connect_async(url.as_str()).await.expect("client B connect");

    send(&mut listener_ws, json!({ "type": "subscribe", "topic": "/topics/livechat" })).await;
    assert_eq!(
        recv(&mut listener_ws).await,
        ServerMessage::Subscribed {
            topic: "/topics/livechat".to_string()
        }
    );

    send(
        &mut speaker_ws,
        json!({ "type": "chat", "username": "bob", "message": "<i>hi</i>" }),
    )
    .await;

    match recv(&mut listener_ws).await {
        ServerMessage::Message { topic, payload, .. } => {
            assert_eq!(topic, "/topics/livechat");
            assert_eq!(payload, "bob: &lt;i&gt;hi&lt;/i&gt;");
        }
        other => panic!("Expected a message, got {other:?}"),
    }
    assert_silent(&mut speaker_ws).await;
}

#[tokio::test]
async fn publish_reaches_every_subscriber_of_the_topic() {
    let (url, _hub) = start_server(Settings::default()).await;
    let (mut a, _) = connect_async(url.as_str()).await.expect("client A connect");
    let (mut b, _) = connect_async(url.as_str()).await.expect("client B connect");

    for ws in [&mut a, &mut b] {
        send(ws, json!({ "type": "subscribe", "topic": "general" })).await;
        assert!(matches!(recv(ws).await, ServerMessage::Subscribed { .. }));
    }

    send(&mut a, json!({ "type": "publish", "topic": "general", "payload": "one" })).await;
    send(&mut a, json!({ "type": "publish", "topic": "general", "payload": "two" })).await;

    for ws in [&mut a, &mut b] {
        for expected in ["one", "two"] {
            match recv(ws).await {
                ServerMessage::Message { payload, .. } => assert_eq!(payload, expected),
                other => panic!("Expected a message, got {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn invalid_frames_get_an_error_reply() {
    let (url, _hub) = start_server(Settings::default()).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("client connect");

    ws.send(WsMessage::Text("{not json".to_string().into()))
        .await
        .unwrap();
    assert!(matches!(recv(&mut ws).await, ServerMessage::Error { .. }));

    send(&mut ws, json!({ "type": "subscribe", "topic": "" })).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn closing_a_connection_removes_its_subscriptions() {
    let (url, hub) = start_server(Settings::default()).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("client connect");

    for topic in ["general", "random"] {
        send(&mut ws, json!({ "type": "subscribe", "topic": topic })).await;
        assert!(matches!(recv(&mut ws).await, ServerMessage::Subscribed { .. }));
    }
    assert_eq!(hub.topics(), vec!["general", "random"]);

    ws.close(None).await.expect("Failed to close WebSocket");
    drop(ws);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !hub.topics().is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "subscriptions were not cleaned up"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn connections_over_the_limit_are_refused() {
    let mut settings = Settings::default();
    settings.server.max_connections = 1;
    let (url, _hub) = start_server(settings).await;

    let (mut first, _) = connect_async(url.as_str()).await.expect("first connect");
    send(&mut first, json!({ "type": "subscribe", "topic": "general" })).await;
    assert!(matches!(recv(&mut first).await, ServerMessage::Subscribed { .. }));

    let (mut second, _) = connect_async(url.as_str()).await.expect("second connect");
    match recv(&mut second).await {
        ServerMessage::Error { message } => assert_eq!(message, "server is at capacity"),
        other => panic!("Expected an error, got {other:?}"),
    }
}

#[tokio::test]
async fn unbounded_connection_limit_still_serves_clients() {
    let mut settings = Settings::default();
    settings.server.max_connections = usize::MAX;
    let (url, hub) = start_server(settings).await;

    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
    send(&mut ws, json!({ "type": "subscribe", "topic": "general" })).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Subscribed { .. }));
    assert_eq!(hub.subscriber_count("general"), 1);
}

#[tokio::test]
async fn subscribe_ack_is_found_behind_earlier_frames() {
    let (url, _hub) = start_server(Settings::default()).await;
    let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");

    send(&mut ws, json!({ "type": "subscribe", "topic": "general" })).await;
    send(&mut ws, json!({ "type": "publish", "topic": "general", "payload": "hi" })).await;
    send(&mut ws, json!({ "type": "subscribe", "topic": "random" })).await;

    let early = chathub::transport::wait_for_subscribed(&mut ws, "random")
        .await
        .expect("subscribe to random");
    assert_eq!(early.len(), 2);
    assert!(matches!(&early[0], ServerMessage::Subscribed { topic } if topic == "general"));
    assert!(matches!(&early[1], ServerMessage::Message { payload, .. } if payload == "hi"));
}
