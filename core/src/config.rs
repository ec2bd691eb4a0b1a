// ## 📂 File: `src/config.rs`

//! config.rs
//! Decoder configuration and resolved worker layout.
//!
//! Design notes:
//! - `DecoderConfig` is what callers write (JSON or code); every field has a default.
//! - `ParallelismProfile` is what the pipeline runs with: counts resolved against the host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_INFLIGHT_SEGMENTS, MAX_WORKERS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid decoder config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("worker_count must be in 1..={max}, got {got}")]
    WorkerCount { got: usize, max: usize },

    #[error("inflight_segments must be at least 1")]
    ZeroInflight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Worker threads. `None` picks from the host core count.
    pub worker_count: Option<usize>,

    /// Capacity of the request and result channels.
    pub inflight_segments: usize,

    /// Share a derived-key cache across workers.
    pub cache_derived_keys: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            inflight_segments: DEFAULT_INFLIGHT_SEGMENTS,
            cache_derived_keys: true,
        }
    }
}

impl DecoderConfig {
    pub fn single_threaded() -> Self {
        Self { worker_count: Some(1), ..Self::default() }
    }

    pub fn with_workers(worker_count: usize) -> Self {
        Self { worker_count: Some(worker_count), ..Self::default() }
    }

    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(got) = self.worker_count {
            if got == 0 || got > MAX_WORKERS {
                return Err(ConfigError::WorkerCount { got, max: MAX_WORKERS });
            }
        }
        if self.inflight_segments == 0 {
            return Err(ConfigError::ZeroInflight);
        }
        Ok(())
    }

    pub fn profile(&self) -> ParallelismProfile {
        match self.worker_count {
            Some(workers) => ParallelismProfile::fixed(workers, self.inflight_segments),
            None => ParallelismProfile::dynamic(self.inflight_segments),
        }
    }
}

/// Parallelism configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    pub inflight_segments: usize,
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self { worker_count: 1, inflight_segments: 1 }
    }

    pub fn fixed(worker_count: usize, inflight_segments: usize) -> Self {
        Self {
            worker_count: worker_count.clamp(1, MAX_WORKERS),
            inflight_segments: inflight_segments.max(1),
        }
    }

    /// Host cores minus one (leave one core free), at least one.
    pub fn dynamic(inflight_segments: usize) -> Self {
        let worker_count = num_cpus::get().saturating_sub(1).max(1);
        Self::fixed(worker_count, inflight_segments)
    }

    /// Never more workers than there is work.
    pub fn for_segments(self, segment_count: usize) -> Self {
        Self {
            worker_count: self.worker_count.min(segment_count.max(1)),
            ..self
        }
    }

    pub fn is_single_threaded(&self) -> bool {
        self.worker_count == 1
    }
}
