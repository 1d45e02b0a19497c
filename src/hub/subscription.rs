use crate::hub::channel::ChannelId;

/// Identifies one (topic, channel) registration.
///
/// Handles are plain values: subscribing the same channel to the same topic
/// twice yields equal handles, and unsubscribing with a stale handle is a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: String,
    channel_id: ChannelId,
}

impl SubscriptionHandle {
    pub fn new(topic: impl Into<String>, channel_id: impl Into<ChannelId>) -> Self {
        Self {
            topic: topic.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }
}
