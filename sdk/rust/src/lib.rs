//! HTTP client for the faucet API.

mod client;

pub use client::*;
