//! Metrics Collector: fixed-capacity sliding window of invocation outcomes

use crate::domain::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error(ErrorKind),
}

impl Outcome {
    pub fn is_ok(self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

/// Wire label of a recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SampleOutcome {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Sample {
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: SampleOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub error_kind: Option<ErrorKind>,
}

/// Read-only view of the window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub count: usize,
    pub failure_count: usize,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub window_capacity: usize,
    pub total_recorded: u64,
    pub success_rate: f64,
    #[schema(value_type = Object)]
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,
    pub uptime_seconds: u64,
    /// Oldest first.
    pub samples: Vec<Sample>,
}

struct Window {
    samples: VecDeque<Sample>,
    total_recorded: u64,
}

pub struct MetricsCollector {
    capacity: usize,
    started: Instant,
    window: Mutex<Window>,
}

impl MetricsCollector {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            started: Instant::now(),
            window: Mutex::new(Window {
                samples: VecDeque::with_capacity(capacity),
                total_recorded: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// The only mutation point; evicts the oldest sample once full.
    pub fn record(&self, outcome: Outcome, duration_ms: u64) {
        let sample = Sample {
            timestamp: Utc::now(),
            duration_ms,
            outcome: if outcome.is_ok() {
                SampleOutcome::Ok
            } else {
                SampleOutcome::Error
            },
            error_kind: match outcome {
                Outcome::Ok => None,
                Outcome::Error(kind) => Some(kind),
            },
        };
        let mut window = self.lock();
        if window.samples.len() == self.capacity {
            window.samples.pop_front();
        }
        window.samples.push_back(sample);
        window.total_recorded += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (samples, total_recorded) = {
            let window = self.lock();
            (
                window.samples.iter().cloned().collect::<Vec<_>>(),
                window.total_recorded,
            )
        };

        let mut latencies: Vec<u64> = samples.iter().map(|s| s.duration_ms).collect();
        latencies.sort_unstable();
        let mut errors_by_kind = BTreeMap::new();
        for kind in samples.iter().filter_map(|s| s.error_kind) {
            *errors_by_kind.entry(kind).or_insert(0) += 1;
        }
        let failure_count = errors_by_kind.values().sum::<usize>();
        let count = samples.len();
        let success_rate = if count == 0 {
            1.0
        } else {
            (count - failure_count) as f64 / count as f64
        };

        MetricsSnapshot {
            count,
            failure_count,
            p50_latency_ms: nearest_rank(&latencies, 50),
            p95_latency_ms: nearest_rank(&latencies, 95),
            window_capacity: self.capacity,
            total_recorded,
            success_rate,
            errors_by_kind,
            uptime_seconds: self.uptime_seconds(),
            samples,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Nearest-rank percentile of sorted values; 0 when empty.
fn nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (percentile * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}
