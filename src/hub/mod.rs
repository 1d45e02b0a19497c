pub mod channel;
pub mod engine;
pub mod message;
pub mod stats;
pub mod subscription;
pub mod topic;

pub use channel::{Channel, ChannelId};
pub use engine::Hub;
pub use message::Message;
pub use stats::{HubStatsSnapshot, PublishReport};
pub use subscription::SubscriptionHandle;
