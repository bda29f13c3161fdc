//! HTTP and WebSocket layer for evhubd.
//!
//! Event streams live under `/1.0/events`; publishing is a plain JSON POST.

pub mod error;
pub mod handlers;
pub mod router;
