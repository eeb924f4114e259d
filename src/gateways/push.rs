use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::GatewayResult;

/// One real-time event addressed to a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub room: String,
    pub event: String,
    pub payload: Value,
}

/// Room key for a user's private channel.
pub fn user_room(user_id: &str) -> String {
    format!("user-{}", user_id)
}

/// Real-time transport. Delivery is fire-and-forget.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn emit(&self, message: PushMessage) -> GatewayResult<()>;
}

/// In-process fan-out: socket sessions subscribe and filter on their room.
#[derive(Debug, Clone)]
pub struct PushHub {
    sender: broadcast::Sender<PushMessage>,
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl PushChannel for PushHub {
    async fn emit(&self, message: PushMessage) -> GatewayResult<()> {
        // No subscribers is not an error: nobody is online.
        match self.sender.send(message) {
            Ok(receivers) => debug!(receivers, "Push event fanned out"),
            Err(broadcast::error::SendError(message)) => debug!(room = %message.room, "No live subscribers"),
        }
        Ok(())
    }
}
