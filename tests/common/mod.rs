//! Integration test common infrastructure.
//!
//! Spawns the full router on an ephemeral port and provides small HTTP and
//! WebSocket clients that speak the chat wire format.

#![allow(dead_code)]

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{PollClient, PushClient};
#[allow(unused_imports)]
pub use server::TestServer;
