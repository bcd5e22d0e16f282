//! HTTP API handlers.

pub mod registration;
