//! Message definitions for the broker
//!
//! `Message` is the chat payload as publishers send it and subscribers
//! decode it. `Event` is what actually travels through the broker and over
//! the streaming connection: the topic label plus the serialized message.
//! The payload is reference counted, so fanning one event out to many
//! subscribers hands each of them a byte-identical copy without re-encoding.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::RelayError;

/// A chat message.
///
/// # Example
///
/// ```rust
/// use topicrelay::broker::message::Message;
///
/// let msg = Message::new("Ann", "hi", "general");
/// assert_eq!(msg.topic, "general");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender display name.
    pub name: String,
    /// Body text.
    pub message: String,
    /// Creation time, serialized as RFC 3339.
    pub time: DateTime<Utc>,
    pub topic: String,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            time: Utc::now(),
            topic: topic.into(),
        }
    }
}

/// The unit carried by a broadcast stream and written as one SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    topic: Arc<str>,
    payload: Bytes,
}

impl Event {
    pub fn new(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Serializes `message` into an event labelled with its own topic.
    pub fn from_message(message: &Message) -> Result<Self, RelayError> {
        let payload = serde_json::to_vec(message)?;
        Ok(Self::new(message.topic.as_str(), payload))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decodes the payload back into a [`Message`].
    pub fn decode(&self) -> Result<Message, RelayError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
