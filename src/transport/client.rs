//! Client side of the wire protocol, used by the `client` subcommand.

use futures_util::{Stream, StreamExt};
use tungstenite::protocol::Message as WsMessage;

use crate::transport::message::ServerMessage;
use crate::utils::ClientError;

/// Read frames until the server confirms the subscription to `topic`.
///
/// Messages published to the topic may overtake the confirmation; they are
/// returned so the caller can show them. Non-text frames are skipped.
pub async fn wait_for_subscribed<S>(
    stream: &mut S,
    topic: &str,
) -> Result<Vec<ServerMessage>, ClientError>
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let mut early = Vec::new();

    while let Some(frame) = stream.next().await {
        let frame = frame?;
        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }

        match serde_json::from_str::<ServerMessage>(frame.to_text()?)? {
            ServerMessage::Subscribed { topic: acked } if acked == topic => return Ok(early),
            ServerMessage::Error { message } => return Err(ClientError::Rejected(message)),
            other => early.push(other),
        }
    }

    Err(ClientError::Closed)
}
