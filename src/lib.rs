//! # topicrelay
//!
//! `topicrelay` is a topic-partitioned chat relay. Publishers post messages
//! over HTTP; subscribers hold a server-sent event stream for one topic at a
//! time and can switch topics without messages of the old topic leaking into
//! the new one.
//!
//! ## Core Modules
//!
//! - `broker`: the fixed topic registry and the per-topic broadcast streams with
//!   bounded, independently failing subscriber queues.
//! - `transport`: the axum HTTP endpoints and the SSE frame codec.
//! - `client`: the HTTP client, the subscription manager that handles topic
//!   switches, and the display-facing session facade.
//! - `config`: loading settings from file, environment and defaults.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
