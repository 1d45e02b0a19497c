//! Topic management
//!
//! A `Topic` holds the subscribers of one topic name behind its own lock.
//! The lock is held for the whole fan-out, so a subscribe or unsubscribe on
//! this topic either happens entirely before a publish or entirely after it.
//!
//! The hub never waits on this lock while it holds a map shard. An empty
//! topic is first marked retired under its own lock and only then dropped
//! from the map; a subscribe that lands on a retired topic starts over.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::hub::channel::{Channel, ChannelId};
use crate::hub::message::Message;
use crate::hub::stats::PublishReport;
use crate::utils::DeliveryFailure;

struct Subscriber {
    channel: Weak<dyn Channel>,
    /// Consecutive `Backpressure` failures; reset on success.
    failures: u32,
}

#[derive(Default)]
struct State {
    subscribers: HashMap<ChannelId, Subscriber>,
    /// Set once the topic is on its way out of the hub's map. Never cleared.
    retired: bool,
}

pub struct Topic {
    pub name: String,
    state: Mutex<State>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    // A panic mid fan-out leaves the map itself consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscriber.
    ///
    /// Returns `None` if the topic is retired and the caller must look it up
    /// again, `Some(false)` if `id` was already subscribed (the existing
    /// registration is kept untouched), `Some(true)` otherwise.
    pub fn subscribe(&self, id: ChannelId, channel: Weak<dyn Channel>) -> Option<bool> {
        let mut state = self.lock();
        if state.retired {
            return None;
        }
        if state.subscribers.contains_key(&id) {
            return Some(false);
        }
        state.subscribers.insert(
            id,
            Subscriber {
                channel,
                failures: 0,
            },
        );
        Some(true)
    }

    /// Remove a subscriber. Returns whether it was present.
    pub fn unsubscribe(&self, id: &ChannelId) -> bool {
        self.lock().subscribers.remove(id).is_some()
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.lock().subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().subscribers.is_empty()
    }

    pub fn is_retired(&self) -> bool {
        self.lock().retired
    }

    /// Mark the topic retired if it has no subscribers. Returns whether the
    /// topic is retired after the call.
    pub fn retire_if_empty(&self) -> bool {
        let mut state = self.lock();
        if state.subscribers.is_empty() {
            state.retired = true;
        }
        state.retired
    }

    /// Drop every subscriber and retire the topic.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.subscribers.clear();
        state.retired = true;
    }

    /// Deliver `message` to every current subscriber.
    ///
    /// Disconnected channels are evicted at once; channels that stay full for
    /// `max_failures` consecutive messages are evicted too and told so.
    pub fn fan_out(&self, message: &Message, max_failures: u32) -> PublishReport {
        let mut report = PublishReport::default();
        let mut state = self.lock();

        state.subscribers.retain(|id, sub| {
            let Some(channel) = sub.channel.upgrade() else {
                debug!(topic = %self.name, channel = %id, "evicting dropped subscriber");
                report.evicted += 1;
                return false;
            };

            match channel.deliver(message) {
                Ok(()) => {
                    sub.failures = 0;
                    report.delivered += 1;
                    true
                }
                Err(DeliveryFailure::Backpressure) => {
                    sub.failures += 1;
                    report.dropped += 1;
                    warn!(
                        topic = %self.name,
                        channel = %id,
                        failures = sub.failures,
                        "delivery failed: {}",
                        DeliveryFailure::Backpressure
                    );
                    if sub.failures >= max_failures {
                        warn!(topic = %self.name, channel = %id, "evicting slow subscriber");
                        channel.evicted(&self.name);
                        report.evicted += 1;
                        false
                    } else {
                        true
                    }
                }
                Err(e @ DeliveryFailure::Encode) => {
                    warn!(topic = %self.name, channel = %id, "delivery failed: {e}");
                    report.dropped += 1;
                    true
                }
                Err(DeliveryFailure::Disconnected) => {
                    debug!(topic = %self.name, channel = %id, "evicting disconnected subscriber");
                    report.evicted += 1;
                    false
                }
            }
        });

        report
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("subscribers", &state.subscribers.len())
            .field("retired", &state.retired)
            .finish()
    }
}
