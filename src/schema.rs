use serde::{Deserialize, Serialize};

use crate::harness::AggregateResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

/// One thread-count configuration of one sweep, mean over all repeats.
/// Raw per-trial samples are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub unit: String,

    pub threads: usize,
    pub ops_per_worker: usize,
    pub repeats: usize,

    pub mean_elapsed_s: f64,

    pub extra: serde_json::Value,
}

impl Measurement {
    pub fn from_aggregate(name: &str, agg: &AggregateResult, extra: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            unit: "s".to_string(),
            threads: agg.workers,
            ops_per_worker: agg.ops_per_worker,
            repeats: agg.repeats,
            mean_elapsed_s: agg.mean_elapsed_s,
            extra,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutBenchReport {
    pub run: RunMeta,
    pub measurements: Vec<Measurement>,
}
