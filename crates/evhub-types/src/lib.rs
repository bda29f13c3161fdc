//! Shared domain types for evhub.
//!
//! This crate contains the types shared by every layer of the event hub:
//! the published `Event`, the error enums produced by transports and
//! listeners, and the daemon configuration structs.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
