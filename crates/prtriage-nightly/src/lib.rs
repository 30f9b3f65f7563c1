//! Nightly test report board reader.

mod client;

pub use client::NightlyClient;
