// # 📂 src/pipeline.rs

// ## 📂 File: `src/pipeline.rs`
// ## Whole-container decryption: parse once, fan segments out to workers

//! Segment decryption is independent per segment: every worker shares the
//! immutable header, key store and (optional) derived-key cache by reference.
//!
//! Design notes:
//! - Scoped threads borrow the caller's buffer; segment ciphertext is never copied.
//! - A feeder thread slices segments out of the container into `SegmentJob`s.
//! - Workers pull jobs from a bounded channel and push `SegmentResult`s.
//! - The calling thread collects results, then joins every worker for its stats.
//! - A segment failure is recorded in its own result; the other segments continue.

use std::thread;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::bounded;
use tracing::{debug, trace, warn};

use crate::config::{DecoderConfig, ParallelismProfile};
use crate::container::{parse, ContainerHeader};
use crate::crypto::{padding_len, DecryptError, DerivedKeyCache, KeyStore};
use crate::segment::{segment_ciphertext, SegmentDecryptor, SegmentResult};
use crate::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::UnlockError;
use crate::utils::concat_segments;

/// Result of decrypting every segment of one container.
#[derive(Debug, Clone)]
pub struct ContainerReport {
    pub header: ContainerHeader,
    /// One entry per real segment, sorted by `segment_index`.
    pub results: Vec<SegmentResult>,
    pub telemetry: TelemetrySnapshot,
}

impl ContainerReport {
    /// All segments concatenated in order, or the first segment error.
    pub fn plaintext(&self) -> Result<Vec<u8>, DecryptError> {
        let parts = self
            .results
            .iter()
            .map(|r| r.outcome.clone())
            .collect::<Result<Vec<Bytes>, _>>()?;
        Ok(concat_segments(&parts))
    }

    /// Indices of segments that failed.
    pub fn failures(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.segment_index)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(SegmentResult::is_ok)
    }

    pub fn segment(&self, index: usize) -> Option<&SegmentResult> {
        self.results.get(index)
    }
}

/// Parse `raw` and decrypt every segment with keys from `store`.
///
/// Errors:
/// - `Config` if `config` does not validate.
/// - `Parse` if the container header is malformed; nothing is decrypted.
/// - `Pipeline` if a worker thread panics.
///
/// Per-segment failures (missing key, truncated buffer, cipher error) are
/// reported in `ContainerReport::results`, not as an `Err`.
pub fn decrypt_container(
    raw: &[u8],
    store: &KeyStore,
    config: &DecoderConfig,
) -> Result<ContainerReport, UnlockError> {
    config.validate()?;

    let mut timer = TelemetryTimer::new();
    let header = timer.time(Stage::Parse, || parse(raw))?;

    let profile = config.profile().for_segments(header.segment_count());
    let cache = config.cache_derived_keys.then(DerivedKeyCache::new);

    let mut decryptor = SegmentDecryptor::new(store, &header);
    if let Some(cache) = &cache {
        decryptor = decryptor.with_cache(cache);
    }

    let (results, stats) = if profile.is_single_threaded() {
        run_inline(raw, &decryptor)
    } else {
        run_workers(raw, &decryptor, profile)?
    };

    let mut counters = stats.counters;
    counters.cache_hits = cache.as_ref().map_or(0, DerivedKeyCache::hits);
    timer.stage_times.merge(&stats.stage_times);
    timer.finish();

    let telemetry = TelemetrySnapshot::from(&counters, &timer, profile.worker_count);
    debug!(
        segments_ok = telemetry.segments_ok,
        segments_failed = telemetry.segments_failed,
        workers = profile.worker_count,
        "container decrypted"
    );

    Ok(ContainerReport { header, results, telemetry })
}

/// Per-thread counters, merged once the thread is joined.
#[derive(Debug, Default)]
struct WorkerStats {
    counters: TelemetryCounters,
    stage_times: StageTimes,
}

impl WorkerStats {
    fn record(&mut self, ct_len: usize, result: &SegmentResult) {
        match &result.outcome {
            Ok(plaintext) => self.counters.add_segment(ct_len, plaintext.len(), padding_len(ct_len)),
            Err(error) => {
                warn!(segment_index = result.segment_index, %error, "segment failed");
                self.counters.add_failure(ct_len);
            }
        }
    }

    fn merge(&mut self, other: &WorkerStats) {
        self.counters.merge(&other.counters);
        self.stage_times.merge(&other.stage_times);
    }
}

/// One segment in flight: a view into the caller's container buffer.
#[derive(Debug, Clone, Copy)]
struct SegmentJob<'a> {
    segment_index: usize,
    ciphertext: &'a [u8],
}

/// Build the job for segment `index`, or its failure if the buffer is too short.
fn locate<'a>(raw: &'a [u8], header: &ContainerHeader, index: usize) -> Result<SegmentJob<'a>, SegmentResult> {
    match segment_ciphertext(raw, header, index) {
        Ok(ciphertext) => Ok(SegmentJob { segment_index: index, ciphertext }),
        Err(error) => Err(SegmentResult { segment_index: index, outcome: Err(error) }),
    }
}

fn process(decryptor: &SegmentDecryptor<'_>, job: &SegmentJob<'_>, stats: &mut WorkerStats) -> SegmentResult {
    let started = Instant::now();
    let key = decryptor.segment_key(job.segment_index);
    stats.stage_times.add(Stage::Derive, started.elapsed());

    let outcome = key.and_then(|key| {
        stats.counters.add_key_derived();
        let started = Instant::now();
        let plaintext = decryptor.decrypt_with_key(&key, job.ciphertext);
        stats.stage_times.add(Stage::Decrypt, started.elapsed());
        plaintext
    });

    trace!(segment_index = job.segment_index, ok = outcome.is_ok(), "segment processed");
    let result = SegmentResult { segment_index: job.segment_index, outcome };
    stats.record(job.ciphertext.len(), &result);
    result
}

fn run_inline(raw: &[u8], decryptor: &SegmentDecryptor<'_>) -> (Vec<SegmentResult>, WorkerStats) {
    let header = decryptor.header();
    let mut stats = WorkerStats::default();

    let results: Vec<SegmentResult> = (0..header.segment_count())
        .map(|index| match locate(raw, header, index) {
            Ok(job) => process(decryptor, &job, &mut stats),
            Err(failed) => {
                stats.record(0, &failed);
                failed
            }
        })
        .collect();

    (results, stats)
}

fn run_workers(
    raw: &[u8],
    decryptor: &SegmentDecryptor<'_>,
    profile: ParallelismProfile,
) -> Result<(Vec<SegmentResult>, WorkerStats), UnlockError> {
    let header = decryptor.header();

    // ---- Channels ----
    let (req_tx, req_rx) = bounded::<SegmentJob<'_>>(profile.inflight_segments);
    let (out_tx, out_rx) = bounded::<SegmentResult>(profile.inflight_segments);

    thread::scope(|scope| {
        // ---- Feeder ----
        let feeder = {
            let out_tx = out_tx.clone();
            scope.spawn(move || {
                let mut stats = WorkerStats::default();
                for index in 0..header.segment_count() {
                    match locate(raw, header, index) {
                        Ok(job) => {
                            if req_tx.send(job).is_err() {
                                break;
                            }
                        }
                        Err(failed) => {
                            stats.record(0, &failed);
                            if out_tx.send(failed).is_err() {
                                break;
                            }
                        }
                    }
                }
                // req_tx drops here: workers drain and exit.
                stats
            })
        };

        // ---- Workers ----
        let workers: Vec<_> = (0..profile.worker_count)
            .map(|worker_id| {
                let rx = req_rx.clone();
                let tx = out_tx.clone();
                scope.spawn(move || {
                    debug!(worker_id, "segment worker starting");
                    let mut stats = WorkerStats::default();
                    for job in rx.iter() {
                        let result = process(decryptor, &job, &mut stats);
                        if tx.send(result).is_err() {
                            break;
                        }
                    }
                    debug!(worker_id, segments = stats.counters.segments_total(), "segment worker finished");
                    stats
                })
            })
            .collect();

        drop(req_rx);
        drop(out_tx);

        // ---- Collector ----
        let mut results: Vec<SegmentResult> = out_rx.iter().collect();
        results.sort_by_key(|r| r.segment_index);

        // Join everything before inspecting, so no panicked thread is left to the scope.
        let joined: Vec<_> = std::iter::once(feeder).chain(workers).map(|h| h.join()).collect();
        let mut total = WorkerStats::default();
        for stats in joined {
            let stats = stats.map_err(|_| UnlockError::Pipeline("segment worker panicked"))?;
            total.merge(&stats);
        }

        if results.len() != header.segment_count() {
            return Err(UnlockError::Pipeline("segment results lost"));
        }
        Ok((results, total))
    })
}
