#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod counters;
pub mod entities;
pub mod events;
pub mod pipeline;
pub mod processors;
pub mod store;
pub mod upstream;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
