//! CLI for chathub
//!
//! Subcommands:
//! - `server`: run the WebSocket relay
//! - `client`: join the chat topic, send one line and print what comes back

use std::sync::Arc;

use chathub::config::load_config;
use chathub::hub::Hub;
use chathub::transport::{start_websocket_server, wait_for_subscribed};
use chathub::utils::logging;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chathub")]
enum Command {
    /// Start the WebSocket relay
    Server {
        /// Overrides `log.level` from the configuration
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Run a smoke-test client against a running relay
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long, default_value = "guest")]
        username: String,
        #[arg(long, default_value = "hello")]
        message: String,
        /// Topic to listen on; must match the server's `chat.topic`
        #[arg(long, default_value = "/topics/livechat")]
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    match Command::parse() {
        Command::Server { log_level } => {
            if let Err(e) = run_server(log_level).await {
                // No-op if the server already initialised logging.
                logging::init("error");
                error!("Server failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Client {
            url,
            username,
            message,
            topic,
        } => {
            logging::init("info");
            if let Err(e) = run_client(&url, &username, &message, &topic).await {
                error!("Client failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_server(log_level: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(log_level.as_deref().unwrap_or(&config.log.level));

    let hub = Arc::new(Hub::with_settings(&config.hub));

    tokio::select! {
        res = start_websocket_server(hub.clone(), config) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    hub.shutdown();
    Ok(())
}

async fn run_client(
    url: &str,
    username: &str,
    message: &str,
    topic: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Subscribe and wait for the ack
    let subscribe = json!({ "type": "subscribe", "topic": topic });
    ws_stream
        .send(WsMessage::Text(subscribe.to_string().into()))
        .await?;
    for early in wait_for_subscribed(&mut ws_stream, topic).await? {
        println!("Incoming: {}", serde_json::to_string(&early)?);
    }
    println!("Subscribed to {topic}");

    // 2. Chat
    let chat = json!({ "type": "chat", "username": username, "message": message });
    ws_stream
        .send(WsMessage::Text(chat.to_string().into()))
        .await?;

    // 3. Our own line comes back through the topic
    if let Some(Ok(WsMessage::Text(incoming))) = ws_stream.next().await {
        println!("Incoming: {incoming}");
    }

    ws_stream.close(None).await?;
    Ok(())
}
