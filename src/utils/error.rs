//! The `error` module defines the error type shared by the broker, the HTTP
//! transport and the client.
//!
//! HTTP status mapping for these variants lives next to the router in
//! `transport::http`.

use thiserror::Error;

use crate::broker::stream::SubscriberId;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Publish or subscribe against a topic that is not in the registry.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// A message payload that does not match the wire format.
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Connection failures, unexpected statuses and broken event streams.
    #[error("transport error: {0}")]
    Transport(String),

    /// The event stream sent a line longer than the decoder accepts.
    #[error("event stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server refused a request as malformed.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A subscriber's queue was full and an event was dropped for it.
    #[error("subscriber {subscriber} on topic {topic} is not keeping up")]
    SlowConsumer {
        topic: String,
        subscriber: SubscriberId,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}
