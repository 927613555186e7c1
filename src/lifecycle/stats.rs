//! Per-request-name latency and failure statistics.
//!
//! Latencies are kept in milliseconds as `f64` so sub-millisecond calls against
//! a local mock still register. Each name keeps at most [`MAX_SAMPLES`]
//! latencies: once full, the oldest sample is overwritten, so percentiles
//! describe the most recent window while counts cover the whole run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latencies retained per request name.
pub const MAX_SAMPLES: usize = 10_000;

#[derive(Debug, Default)]
struct Samples {
    latencies: Vec<f64>,
    count: usize,
    failures: u64,
}

impl Samples {
    fn push(&mut self, latency_ms: f64) {
        if self.latencies.len() < MAX_SAMPLES {
            self.latencies.push(latency_ms);
        } else {
            self.latencies[self.count % MAX_SAMPLES] = latency_ms;
        }
        self.count += 1;
    }
}

/// Thread-safe tracker shared by every actor of a run
#[derive(Debug, Default)]
pub struct RequestStats {
    samples: Mutex<HashMap<String, Samples>>,
}

/// Aggregated view of one request name.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSummary {
    pub name: String,
    /// Successful and failed requests together.
    pub count: usize,
    pub failures: u64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, name: &str, latency_ms: f64) {
        self.record(name, latency_ms, false);
    }

    pub fn record_failure(&self, name: &str, latency_ms: f64) {
        self.record(name, latency_ms, true);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Samples>> {
        // Every update leaves the map consistent, so a poisoned lock is still usable.
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, name: &str, latency_ms: f64, failed: bool) {
        let mut map = self.lock();
        let samples = map.entry(name.to_string()).or_default();
        samples.push(latency_ms);
        if failed {
            samples.failures += 1;
        }
    }

    pub fn summary(&self, name: &str) -> Option<RequestSummary> {
        self.lock().get(name).map(|samples| summarize(name, samples))
    }

    /// Every request name seen, sorted by name.
    pub fn summaries(&self) -> Vec<RequestSummary> {
        let map = self.lock();
        let mut summaries: Vec<_> = map
            .iter()
            .map(|(name, samples)| summarize(name, samples))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn total_requests(&self) -> usize {
        self.lock().values().map(|samples| samples.count).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.lock().values().map(|samples| samples.failures).sum()
    }
}

fn summarize(name: &str, samples: &Samples) -> RequestSummary {
    let (p50, p95, p99) = percentiles(&samples.latencies);
    RequestSummary {
        name: name.to_string(),
        count: samples.count,
        failures: samples.failures,
        p50,
        p95,
        p99,
    }
}

fn percentiles(latencies: &[f64]) -> (f64, f64, f64) {
    if latencies.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mut sorted = latencies.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let len = sorted.len();
    let p50 = sorted[((len as f64 * 0.50) as usize).min(len - 1)];
    let p95 = sorted[((len as f64 * 0.95) as usize).min(len - 1)];
    let p99 = sorted[((len as f64 * 0.99) as usize).min(len - 1)];
    (p50, p95, p99)
}
