//! Polls devices and HTTP endpoints for liveness and prints one JSON array
//! per polling round.
//!
//! Each worker kind (`snmp`, `url`) runs one watcher task per target. The
//! watchers feed a shared channel; an aggregator cuts it into rounds of
//! exactly one result per target and writes each round as a line:
//!
//! ```text
//! [{"host":"10.0.0.1","isAlive":true,"message":""}, ...]
//! [{"url":"http://x/health","status":200,"body":"ok","message":""}, ...]
//! ```
//!
//! Run with
//!
//! ```not_rust
//! cargo run -- --config etc/poller.yml
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use error::{Error, Result};
