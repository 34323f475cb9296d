//! Request and response shapes of the HTTP protocol.

use serde::{Deserialize, Serialize};

/// Body returned by the publish endpoint on success.
pub const PUBLISH_ACK: &str = "OK";

/// Event name used by SSE when a frame carries no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

pub const MESSAGES_PATH: &str = "/messages";
pub const TOPICS_PATH: &str = "/topics";
pub const EVENTS_PATH: &str = "/events";

/// Query string of `GET /events`.
#[derive(Debug, Deserialize, Serialize)]
pub struct EventsQuery {
    pub topic: String,
}
