//! Streaming endpoint body: turns a broker subscription into SSE frames.

use std::convert::Infallible;

use axum::response::sse::Event as SseEvent;
use futures::Stream;
use futures::stream;
use tracing::{info, warn};

use crate::broker::Subscription;
use crate::broker::message::Event;

/// Streams every event delivered to `subscription` as one SSE frame.
///
/// The subscription lives inside the stream. When the client goes away axum
/// drops the stream, the subscription with it, and that detaches it from the
/// broker.
pub fn event_stream(
    subscription: Subscription,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    let connection = ConnectionLog {
        topic: subscription.topic().to_string(),
        subscriber: subscription.id().to_string(),
    };

    stream::unfold(
        (subscription, connection),
        |(mut subscription, connection)| async move {
            loop {
                let event = subscription.recv().await?;
                if let Some(frame) = encode_frame(&event) {
                    return Some((Ok(frame), (subscription, connection)));
                }
            }
        },
    )
}

/// Encodes one event as `event: <topic>` / `data: <payload>`.
///
/// Topics or payloads containing line breaks, and payloads that are not
/// UTF-8, cannot be framed and are skipped.
pub fn encode_frame(event: &Event) -> Option<SseEvent> {
    if event.topic().contains(['\r', '\n']) {
        warn!(topic = ?event.topic(), "skipping event with line breaks in its topic");
        return None;
    }
    let data = match std::str::from_utf8(event.payload()) {
        Ok(data) => data,
        Err(err) => {
            warn!(topic = event.topic(), error = %err, "skipping non UTF-8 payload");
            return None;
        }
    };
    if data.contains(['\r', '\n']) {
        warn!(topic = event.topic(), "skipping payload with line breaks");
        return None;
    }
    Some(SseEvent::default().event(event.topic()).data(data))
}

/// Logs the end of a streaming connection.
struct ConnectionLog {
    topic: String,
    subscriber: String,
}

impl Drop for ConnectionLog {
    fn drop(&mut self) {
        info!(topic = %self.topic, subscriber = %self.subscriber, "event stream closed");
    }
}
