//! Broker engine
//!
//! The `Broker` owns the topic registry and one [`BroadcastStream`] per
//! registered topic. It is the only thing the HTTP endpoints talk to.
//!
//! Concurrency and usage notes:
//! - The topic map is built once and never mutated, so the broker is shared
//!   as a plain `Arc<Broker>` without an outer lock. Each stream guards its
//!   own subscriber set.
//! - Every operation is synchronous and non-blocking; callers can use it
//!   from async handlers directly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::broker::message::Event;
use crate::broker::registry::TopicRegistry;
use crate::broker::stream::{BroadcastStream, SubscriberId, Subscription};
use crate::config::BrokerSettings;
use crate::utils::RelayError;

#[derive(Debug)]
pub struct Broker {
    registry: TopicRegistry,
    streams: HashMap<String, Arc<BroadcastStream>>,
}

impl Broker {
    /// Creates a broker for a fixed set of topics; each subscriber queue
    /// holds at most `subscriber_buffer` events.
    pub fn new<I, S>(topics: I, subscriber_buffer: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = TopicRegistry::new(topics);
        let streams = registry
            .list_topics()
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    Arc::new(BroadcastStream::new(name, subscriber_buffer)),
                )
            })
            .collect();

        Self { registry, streams }
    }

    pub fn from_settings(settings: &BrokerSettings) -> Self {
        Self::new(settings.topics.iter().cloned(), settings.subscriber_buffer)
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn list_topics(&self) -> &[String] {
        self.registry.list_topics()
    }

    /// Attaches a new subscriber to `topic`.
    pub fn attach(&self, topic: &str) -> Result<Subscription, RelayError> {
        Ok(self.stream(topic)?.attach())
    }

    /// Detaches subscriber `id` from `topic`. Returns `Ok(false)` when it was
    /// already detached.
    pub fn detach(&self, topic: &str, id: SubscriberId) -> Result<bool, RelayError> {
        Ok(self.stream(topic)?.detach(id))
    }

    /// Fans `event` out to every subscriber of `topic` and returns the number
    /// of subscribers that accepted it.
    pub fn publish(&self, topic: &str, event: Event) -> Result<usize, RelayError> {
        let stream = self.stream(topic)?;
        let delivered = stream.publish(&event);
        debug!(
            topic,
            delivered,
            bytes = event.payload().len(),
            "published event"
        );
        Ok(delivered)
    }

    pub fn subscriber_count(&self, topic: &str) -> Result<usize, RelayError> {
        Ok(self.stream(topic)?.subscriber_count())
    }

    pub fn stream(&self, topic: &str) -> Result<&Arc<BroadcastStream>, RelayError> {
        self.streams
            .get(topic)
            .ok_or_else(|| RelayError::UnknownTopic(topic.to_string()))
    }
}
