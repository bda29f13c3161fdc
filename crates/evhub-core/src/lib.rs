//! Listener lifecycle and event dispatch for evhub.
//!
//! This crate defines the connection "ports" that transports implement and
//! the `Hub` that tracks listeners and fans events out to them. It depends
//! only on `evhub-types` -- never on `evhub-infra` or any network crate.

pub mod connection;
pub mod filter;
pub mod hub;
pub mod listener;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{BoxFrameSink, Connection, Frame, FrameSink, FrameStream};
pub use filter::EventFilter;
pub use hub::Hub;
pub use listener::{CloseReason, Listener, ListenerOptions};
