use redis::AsyncCommands;
use serde::Serialize;
use uuid::Uuid;

/// Redis pub/sub channel for chat messages.
pub const CHAT_CHANNEL: &str = "feed:chat";
/// Redis pub/sub channel for pickup queue changes.
pub const PICKUP_CHANNEL: &str = "feed:pickup";

/// Event envelope pushed to WebSocket subscribers. Every event carries the
/// entity id so clients can apply it as a keyed upsert and tolerate
/// duplicate or out-of-order delivery.
#[derive(Debug, Serialize)]
pub struct FeedEvent<T: Serialize> {
    pub kind: &'static str,
    pub entity_id: Uuid,
    pub payload: T,
}

/// Publish best-effort: the triggering mutation already committed, so a
/// failed publish is logged and swallowed.
pub async fn publish<T: Serialize>(
    redis: &mut redis::aio::MultiplexedConnection,
    channel: &str,
    event: &FeedEvent<T>,
) {
    let payload = match serde_json::to_string(event) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("feed event serialize failed on {channel}: {e}");
            return;
        }
    };
    if let Err(e) = redis.publish::<_, _, ()>(channel, payload).await {
        tracing::warn!("feed publish failed on {channel}: {e}");
    }
}
