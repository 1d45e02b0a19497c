//! WebSocket transport
//!
//! A thin adapter in front of the hub. Responsibilities:
//! - accept TCP/WebSocket connections, up to `server.max_connections`
//! - create a `Client` per connection and drain its queue into the socket
//! - decode JSON frames, escape user text and forward to the hub
//! - remove every subscription of a client when its connection ends
//!
//! The hub only ever sees escaped text and a weak reference to the client.

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::Client;
use crate::client::pubsub_client::{Evictions, encode};
use crate::config::Settings;
use crate::hub::{Hub, SubscriptionHandle};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::transport::sanitize::{chat_line, escape_html};

/// Bind `server.host:server.port` and serve until the listener fails.
pub async fn start_websocket_server(hub: Arc<Hub>, settings: Settings) -> std::io::Result<()> {
    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("WebSocket server listening on ws://{addr}");

    serve(listener, hub, settings).await
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>, settings: Settings) -> std::io::Result<()> {
    let settings = Arc::new(settings);
    let limit = Arc::new(Semaphore::new(
        settings.server.max_connections.min(Semaphore::MAX_PERMITS),
    ));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // Usually transient (e.g. out of file descriptors).
                error!("accept failed: {e}");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        };

        let hub = hub.clone();
        let settings = settings.clone();
        let permit = limit.clone().try_acquire_owned().ok();

        tokio::spawn(async move {
            handle_connection(stream, peer, hub, settings, permit).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    settings: Arc<Settings>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let Some(_permit) = permit else {
        warn!(%peer, "connection limit reached, refusing");
        if let Ok(frame) = encode(&ServerMessage::error("server is at capacity")) {
            let _ = ws_sender.send(frame).await;
        }
        let _ = ws_sender.close().await;
        return;
    };

    let (tx, mut rx) = mpsc::channel::<WsMessage>(settings.hub.channel_capacity.max(1));
    let client = Arc::new(Client::new(tx));
    let client_id = client.id.clone();
    info!(client = %client_id, %peer, "connected");

    let writer = {
        let client_id = client_id.clone();
        let evictions = client.evictions();
        tokio::spawn(async move {
            forward_frames(&mut rx, &mut ws_sender, &evictions, &client_id).await;
        })
    };

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(client = %client_id, "read error: {e}");
                break;
            }
        };

        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        if let Ok(text) = msg.to_text() {
            handle_frame(text, &client, &hub, &settings);
        }
    }

    let removed = hub.unsubscribe_channel(&client_id);
    info!(client = %client_id, subscriptions = removed, "disconnected");

    // Last strong reference: closes the queue and lets the writer finish.
    drop(client);
    let _ = writer.await;
}

/// Drain a client's queue into `sink`, then close it.
///
/// Eviction notices are sent right after the frame that made room for them,
/// so they reach the client in order with the messages it did receive.
pub async fn forward_frames<S>(
    rx: &mut mpsc::Receiver<WsMessage>,
    sink: &mut S,
    evictions: &Evictions,
    client_id: &str,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    'send: while let Some(msg) = rx.recv().await {
        if let Err(e) = sink.send(msg).await {
            warn!(client = %client_id, "failed to send frame: {e}");
            break;
        }

        for topic in evictions.take() {
            warn!(client = %client_id, %topic, "notifying client of eviction");
            let frame = match encode(&ServerMessage::Evicted { topic }) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(client = %client_id, "failed to serialize frame: {e}");
                    continue;
                }
            };
            if let Err(e) = sink.send(frame).await {
                warn!(client = %client_id, "failed to send frame: {e}");
                break 'send;
            }
        }
    }

    let _ = sink.close().await;
    debug!(client = %client_id, "send loop closed");
}

/// Decode one text frame from `client` and apply it to the hub.
pub fn handle_frame(text: &str, client: &Arc<Client>, hub: &Hub, settings: &Settings) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { topic }) => match hub.subscribe(&topic, client) {
            Ok(_) => {
                info!(client = %client.id, %topic, "subscribed");
                reply(client, ServerMessage::Subscribed { topic });
            }
            Err(e) => {
                warn!(client = %client.id, "subscribe rejected: {e}");
                reply(client, ServerMessage::error(e.to_string()));
            }
        },

        Ok(ClientMessage::Unsubscribe { topic }) => {
            hub.unsubscribe(&SubscriptionHandle::new(topic.as_str(), client.id.as_str()));
            info!(client = %client.id, %topic, "unsubscribed");
            reply(client, ServerMessage::Unsubscribed { topic });
        }

        Ok(ClientMessage::Publish { topic, payload }) => {
            let report = hub.publish(&topic, escape_html(&payload));
            debug!(client = %client.id, %topic, delivered = report.delivered, "published");
        }

        Ok(ClientMessage::Chat { username, message }) => {
            let topic = &settings.chat.topic;
            let report = hub.publish(topic, chat_line(&username, &message));
            debug!(client = %client.id, %topic, delivered = report.delivered, "chat relayed");
        }

        Err(err) => {
            warn!(
                client = %client.id,
                "invalid client message: {err} | {}",
                text.chars().take(100).collect::<String>()
            );
            reply(client, ServerMessage::error(format!("invalid message: {err}")));
        }
    }
}

fn reply(client: &Client, msg: ServerMessage) {
    if let Err(e) = client.send(&msg) {
        warn!(client = %client.id, "failed to queue reply: {e}");
    }
}
