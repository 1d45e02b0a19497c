//! Hub engine
//!
//! The in-memory hub responsible for:
//! - mapping topic names to their current subscribers
//! - fanning each published message out to those subscribers
//! - isolating and evicting channels that cannot keep up or have gone away
//!
//! Concurrency notes:
//! - The public API takes `&self` and is meant to be shared as `Arc<Hub>`.
//! - Topics live in a sharded `DashMap`; each `Topic` has its own lock, so
//!   traffic on unrelated topics never serialises on a global lock.
//! - A map shard guard is never held while a topic lock is taken. Every
//!   path resolves the `Arc<Topic>` first, drops the guard, then locks.
//!   Removal of empty topics goes through the topic's `retired` flag.
//! - Delivery is non-blocking (`Channel::deliver`), so a publish is bounded
//!   by the number of subscribers, never by how fast they read.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::HubSettings;
use crate::hub::channel::{Channel, ChannelId};
use crate::hub::message::Message;
use crate::hub::stats::{HubStats, HubStatsSnapshot, PublishReport};
use crate::hub::subscription::SubscriptionHandle;
use crate::hub::topic::Topic;
use crate::utils::HubError;

pub struct Hub {
    topics: DashMap<String, Arc<Topic>>,
    max_delivery_failures: u32,
    stats: HubStats,
}

impl Hub {
    /// Consecutive full-queue failures tolerated before a subscription is
    /// evicted.
    pub const DEFAULT_MAX_DELIVERY_FAILURES: u32 = 8;

    pub fn new() -> Self {
        Self::with_max_delivery_failures(Self::DEFAULT_MAX_DELIVERY_FAILURES)
    }

    pub fn with_settings(settings: &HubSettings) -> Self {
        Self::with_max_delivery_failures(settings.max_delivery_failures)
    }

    pub fn with_max_delivery_failures(max_delivery_failures: u32) -> Self {
        Self {
            topics: DashMap::new(),
            max_delivery_failures: max_delivery_failures.max(1),
            stats: HubStats::default(),
        }
    }

    /// Register `channel` under `topic`, creating the topic on first use.
    ///
    /// Subscribing the same channel twice is a no-op that returns the same
    /// handle. The hub keeps only a weak reference to the channel.
    pub fn subscribe<C>(&self, topic: &str, channel: &Arc<C>) -> Result<SubscriptionHandle, HubError>
    where
        C: Channel + 'static,
    {
        if topic.trim().is_empty() {
            return Err(HubError::InvalidTopic(topic.to_string()));
        }

        let channel_id = channel.id().clone();
        let weak: Weak<C> = Arc::downgrade(channel);

        // The shard guard is gone before the topic is locked. Landing on a
        // retired topic means a sweep got there first: drop it and retry.
        let added = loop {
            let target = self.topic_or_insert(topic);
            match target.subscribe(channel_id.clone(), weak.clone()) {
                Some(added) => break added,
                None => self.remove_exact(&target),
            }
        };

        if added {
            debug!(%topic, channel = %channel_id, "subscribed");
        }

        Ok(SubscriptionHandle::new(topic, channel_id))
    }

    /// Remove one registration. Returns whether anything was removed.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let Some(topic) = self.topic(handle.topic()) else {
            return false;
        };

        let removed = topic.unsubscribe(handle.channel_id());
        if removed {
            debug!(topic = %handle.topic(), channel = %handle.channel_id(), "unsubscribed");
            self.remove_if_empty(handle.topic());
        }
        removed
    }

    /// Remove every registration of one channel, e.g. when its connection
    /// closes. Returns the number of topics it was removed from.
    pub fn unsubscribe_channel(&self, channel_id: &ChannelId) -> usize {
        let topics = self.snapshot_topics();

        let mut removed = 0;
        for topic in topics {
            if topic.unsubscribe(channel_id) {
                removed += 1;
                self.remove_if_empty(&topic.name);
            }
        }

        debug!(channel = %channel_id, topics = removed, "cleaned up channel");
        removed
    }

    /// Fan `payload` out to every channel subscribed to `topic` right now.
    ///
    /// Never fails: per-channel failures are logged, counted in
    /// [`Hub::stats`] and reflected in the returned report.
    pub fn publish(&self, topic: &str, payload: impl Into<String>) -> PublishReport {
        let report = match self.topic(topic) {
            Some(target) => {
                let message = Message::new(topic, payload);
                let report = target.fan_out(&message, self.max_delivery_failures);
                if report.evicted > 0 {
                    self.remove_if_empty(topic);
                }
                report
            }
            None => {
                debug!(%topic, "no subscribers, nothing to deliver");
                PublishReport::default()
            }
        };

        self.stats.record(&report);
        report
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topic(topic).map_or(0, |t| t.len())
    }

    pub fn is_subscribed(&self, handle: &SubscriptionHandle) -> bool {
        self.topic(handle.topic())
            .is_some_and(|t| t.contains(handle.channel_id()))
    }

    /// Names of all topics with at least one subscriber, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }

    /// Drop every topic and every channel reference.
    pub fn shutdown(&self) {
        let topics = self.snapshot_topics();
        for topic in &topics {
            topic.close();
            self.remove_exact(topic);
        }
        info!(topics = topics.len(), "hub shut down");
    }

    fn topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn topic_or_insert(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.topic(name) {
            return topic;
        }
        Arc::clone(
            self.topics
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Topic::new(name)))
                .value(),
        )
    }

    fn snapshot_topics(&self) -> Vec<Arc<Topic>> {
        self.topics
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Drop `name` from the map if it has no subscribers. The topic is
    /// retired under its own lock first, so no subscribe can slip in.
    fn remove_if_empty(&self, name: &str) {
        if let Some(topic) = self.topic(name) {
            if topic.retire_if_empty() {
                self.remove_exact(&topic);
                debug!(topic = %name, "removed empty topic");
            }
        }
    }

    // Only ever compares pointers under the shard lock, never locks the topic.
    fn remove_exact(&self, topic: &Arc<Topic>) {
        self.topics
            .remove_if(topic.name.as_str(), |_, current| Arc::ptr_eq(current, topic));
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("topics", &self.topics.len())
            .field("max_delivery_failures", &self.max_delivery_failures)
            .finish()
    }
}
