//! Outbound delivery paths
//!
//! A `Channel` is one subscriber's way out of the hub. It is owned by its
//! connection; the hub only keeps a `Weak` to it, so a dropped connection
//! can never be kept alive by a stale subscription.

use crate::hub::message::Message;
use crate::utils::DeliveryFailure;

pub type ChannelId = String;

pub trait Channel: Send + Sync {
    /// Stable identity of this channel across all of its subscriptions.
    fn id(&self) -> &ChannelId;

    /// Hand `message` to the channel without blocking.
    ///
    /// Implementations must return promptly: a full queue is reported as
    /// `Backpressure`, a gone receiver as `Disconnected`.
    fn deliver(&self, message: &Message) -> Result<(), DeliveryFailure>;

    /// Called once when the hub drops this channel's subscription to `topic`
    /// because it kept failing with `Backpressure`. Must not block.
    fn evicted(&self, _topic: &str) {}
}
