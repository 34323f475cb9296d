//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `topicrelay` crate.
//!
//! It holds the crate-wide error type and the tracing initialization used by
//! the binary.

pub mod error;
pub mod logging;

pub use error::RelayError;
