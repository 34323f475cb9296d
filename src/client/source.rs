//! The seam between the subscription manager and whatever produces events.
//!
//! Over the network this is [`RelayClient`](crate::client::api::RelayClient);
//! anything else that can open a per-topic event stream works the same way.

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::broker::message::Event;
use crate::utils::RelayError;

/// Events of one topic subscription, in delivery order. Dropping the stream
/// ends the subscription.
pub type EventStream = BoxStream<'static, Result<Event, RelayError>>;

pub trait EventSource: Send + Sync + 'static {
    /// Opens a subscription for `topic`. Resolves once the subscription is
    /// established, so that every event published afterwards is delivered.
    fn open<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<EventStream, RelayError>>;
}
