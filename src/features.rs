// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Feature Extraction
 * Reduces each probe's observation sequence to a statistical summary
 *
 * Pure and total: any well-typed observation set produces a well-formed
 * FeatureSet, degenerate inputs yield zeroed statistics. Each sequence's
 * features depend only on its own observations plus the baseline summary.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};

use crate::http_client::Observation;
use crate::probes::BASELINE_SEQ;

/// A sequence is considered back to baseline-like behavior below this drift
const RECOVERY_DRIFT_CEILING: f64 = 1.1;

/// Mean and population standard deviation of successful-request latencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub mean: f64,
    pub std: f64,
}

impl LatencyStats {
    pub const ZERO: LatencyStats = LatencyStats { mean: 0.0, std: 0.0 };
}

/// Statistical summary of one named probe sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceFeatures {
    pub lat_mean: f64,
    pub lat_std: f64,
    /// Mean latency relative to baseline mean; 0.0 when baseline mean is 0.
    /// "No drift" and "no baseline signal" are indistinguishable by design.
    pub lat_drift_ratio: f64,
    /// Status code (decimal string, "0" = transport failure) -> count
    pub status_hist: BTreeMap<String, usize>,
    pub error_count: usize,
    pub set_cookie_count: usize,
    pub unique_body_hashes: usize,
    pub unique_header_keys: usize,
    /// True when the sequence looks baseline-like again: at least one
    /// success, no transport errors, no 403/429, drift below 1.1
    pub recovery: bool,
}

impl SequenceFeatures {
    pub fn saw_status(&self, code: &str) -> bool {
        self.status_hist.contains_key(code)
    }
}

/// Per-sequence features in canonical probe order, plus the baseline's own
/// latency summary kept separately for drift computation and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSet {
    pub baseline: LatencyStats,
    #[serde(serialize_with = "serialize_seq_ordered")]
    pub seq: Vec<(String, SequenceFeatures)>,
}

impl FeatureSet {
    pub fn get(&self, name: &str) -> Option<&SequenceFeatures> {
        self.seq
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    pub fn total_set_cookies(&self) -> usize {
        self.seq.iter().map(|(_, f)| f.set_cookie_count).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.seq.iter().map(|(_, f)| f.error_count).sum()
    }
}

// JSON objects are emitted in pair order, never re-sorted through a map type.
fn serialize_seq_ordered<S: Serializer>(
    seq: &[(String, SequenceFeatures)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(seq.len()))?;
    for (name, feat) in seq {
        map.serialize_entry(name, feat)?;
    }
    map.end()
}

fn successful_latencies(observations: &[Observation]) -> Vec<f64> {
    observations
        .iter()
        .filter(|o| o.error.is_none())
        .map(|o| o.total_ms)
        .collect()
}

fn latency_stats(samples: &[f64]) -> LatencyStats {
    match samples.len() {
        0 => LatencyStats::ZERO,
        1 => LatencyStats {
            mean: samples[0],
            std: 0.0,
        },
        n => {
            let mean = samples.iter().sum::<f64>() / n as f64;
            let variance = samples
                .iter()
                .map(|x| (x - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            LatencyStats {
                mean,
                std: variance.sqrt(),
            }
        }
    }
}

fn sequence_features(observations: &[Observation], baseline: LatencyStats) -> SequenceFeatures {
    let latencies = successful_latencies(observations);
    let stats = latency_stats(&latencies);

    let mut status_hist: BTreeMap<String, usize> = BTreeMap::new();
    let mut error_count = 0;
    let mut set_cookie_count = 0;
    let mut body_hashes: HashSet<&str> = HashSet::new();
    let mut header_keys: HashSet<&str> = HashSet::new();

    for obs in observations {
        if obs.error.is_some() {
            error_count += 1;
        }
        *status_hist.entry(obs.status.to_string()).or_insert(0) += 1;
        if !obs.set_cookie.is_empty() {
            set_cookie_count += 1;
        }
        if !obs.body_hash16.is_empty() {
            body_hashes.insert(obs.body_hash16.as_str());
        }
        for key in obs.headers.keys() {
            header_keys.insert(key.as_str());
        }
    }

    let lat_drift_ratio = if baseline.mean > 0.0 {
        stats.mean / baseline.mean
    } else {
        0.0
    };

    let recovery = !latencies.is_empty()
        && error_count == 0
        && !status_hist.contains_key("403")
        && !status_hist.contains_key("429")
        && lat_drift_ratio < RECOVERY_DRIFT_CEILING;

    SequenceFeatures {
        lat_mean: stats.mean,
        lat_std: stats.std,
        lat_drift_ratio,
        status_hist,
        error_count,
        set_cookie_count,
        unique_body_hashes: body_hashes.len(),
        unique_header_keys: header_keys.len(),
        recovery,
    }
}

/// Reduce the full observation set to per-sequence features.
pub fn extract(observations: &[(String, Vec<Observation>)]) -> FeatureSet {
    let baseline_obs: &[Observation] = observations
        .iter()
        .find(|(name, _)| name == BASELINE_SEQ)
        .map(|(_, obs)| obs.as_slice())
        .unwrap_or(&[]);
    let baseline = latency_stats(&successful_latencies(baseline_obs));

    let seq = observations
        .iter()
        .map(|(name, obs)| (name.clone(), sequence_features(obs, baseline)))
        .collect();

    FeatureSet { baseline, seq }
}
