// ## src/telemetry/snapshot.rs

//! telemetry/snapshot.rs
//! Immutable summary of one container decryption run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub segments_total: u64,
    pub segments_ok: u64,
    pub segments_failed: u64,
    pub bytes_ciphertext: u64,
    pub bytes_plaintext: u64,
    pub bytes_padding: u64,
    pub keys_derived: u64,
    pub cache_hits: u64,
    pub worker_count: usize,
    pub throughput_plaintext_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer, worker_count: usize) -> Self {
        let elapsed = timer.elapsed();
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_plaintext as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            segments_total: counters.segments_total(),
            segments_ok: counters.segments_ok,
            segments_failed: counters.segments_failed,
            bytes_ciphertext: counters.bytes_ciphertext,
            bytes_plaintext: counters.bytes_plaintext,
            bytes_padding: counters.bytes_padding,
            keys_derived: counters.keys_derived,
            cache_hits: counters.cache_hits,
            worker_count,
            throughput_plaintext_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Internal invariants: plaintext never exceeds ciphertext, totals add up.
    pub fn sanity_check(&self) -> bool {
        self.bytes_plaintext <= self.bytes_ciphertext
            && self.segments_ok + self.segments_failed == self.segments_total
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
