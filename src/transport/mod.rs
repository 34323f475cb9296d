//! The `transport` module is responsible for the network side of the relay.
//!
//! It defines the HTTP protocol constants, the axum router with the publish,
//! topic list and event stream endpoints, and the SSE frame codec used on
//! both ends of the event stream.

pub mod frame;
pub mod http;
pub mod message;
pub mod sse;

pub use http::{router, serve, start_http_server};
