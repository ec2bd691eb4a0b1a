// ## src/telemetry/mod.rs

//! telemetry/mod.rs
//! Counters, stage timers and immutable snapshots for container decryption.
//!
//! Industry notes:
//! - Workers keep local counters and merge once at the end, so the hot path takes no locks.
//! - Snapshots are plain data (`serde`) and never change after a run completes.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
