#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![forbid(unsafe_code)]

pub mod engine;
pub mod entities;
pub mod errors;
pub mod events;
pub mod formatter;
pub mod framework;
pub mod media;
pub mod processors;
pub mod store;
pub mod telegram;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
