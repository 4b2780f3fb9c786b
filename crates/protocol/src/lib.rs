//! Shared wire types for the code-model backend.
//!
//! This crate defines the messages exchanged between an editor front end and
//! the out-of-process backend. It only fixes the shape of each message; how the
//! messages are framed on a transport is left to the transport.

#![warn(missing_docs)]

pub mod messages;
pub mod types;

pub use messages::{Inbound, Outbound};
pub use types::*;

#[cfg(test)]
mod tests;
