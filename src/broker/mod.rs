//! The `broker` module holds the server-side core: the fixed topic registry,
//! the per-topic broadcast streams and the `Broker` that ties them together.

pub mod engine;
pub mod message;
pub mod registry;
pub mod stream;

pub use engine::Broker;
pub use message::{Event, Message};
pub use stream::{SubscriberId, Subscription};

#[cfg(test)]
mod tests;
