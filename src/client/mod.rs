//! The `client` module is the subscriber side of the relay.
//!
//! - `api`: HTTP client for the topic list, publishing and event streams
//! - `source`: the `EventSource` trait the subscription manager reads from
//! - `subscription`: topic switching with detach-before-attach semantics
//! - `sink`: the display-facing callback interface
//! - `session`: the facade a chat front end drives

pub mod api;
pub mod session;
pub mod sink;
pub mod source;
pub mod subscription;

pub use api::RelayClient;
pub use session::ChatSession;
pub use sink::{ChannelSink, DisplaySink, DisplayUpdate};
pub use source::{EventSource, EventStream};
pub use subscription::{SubscriptionManager, SubscriptionState};
