//! Small numeric helpers shared by the extractors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rank-interpolated percentile over an ascending-sorted slice.
///
/// `p` is in [0, 100]. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some((sorted[lo] + (sorted[hi] - sorted[lo]) * frac).clamp(sorted[lo], sorted[hi]))
}

/// Distribution summary of latency-like samples (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencySummary {
    /// Summarize samples in any order. `None` when there are no samples;
    /// non-finite values are ignored.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let sum: f64 = sorted.iter().sum();
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sum / sorted.len() as f64,
            p50: percentile(&sorted, 50.0)?,
            p95: percentile(&sorted, 95.0)?,
            p99: percentile(&sorted, 99.0)?,
        })
    }
}

/// `part / whole` as a percentage rounded to two decimals, 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One fixed-width histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub count: usize,
}

/// Fixed-width time histogram spanning the observed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeHistogram {
    /// Effective bucket width; wider than requested when the range needs
    /// more than the allowed number of buckets.
    pub bucket_width_secs: u64,
    pub buckets: Vec<Bucket>,
}

impl TimeHistogram {
    /// Build a histogram with buckets aligned to multiples of the width.
    /// Empty buckets inside the range are included.
    pub fn build(timestamps: &[DateTime<Utc>], width_secs: u64, max_buckets: usize) -> Self {
        let width = width_secs.max(1) as i64;
        let (Some(min), Some(max)) = (timestamps.iter().min(), timestamps.iter().max()) else {
            return Self {
                bucket_width_secs: width as u64,
                buckets: Vec::new(),
            };
        };

        let span_buckets = |w: i64| {
            let first = min.timestamp().div_euclid(w);
            let last = max.timestamp().div_euclid(w);
            (first, (last - first + 1) as usize)
        };
        let max_buckets = max_buckets.max(1);
        let (_, needed) = span_buckets(width);
        let mut factor = needed.div_ceil(max_buckets).max(1) as i64;
        // bucket alignment can add one extra bucket at the edge
        while span_buckets(width * factor).1 > max_buckets {
            factor += 1;
        }
        let width = width * factor;
        let (first, len) = span_buckets(width);

        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for ts in timestamps {
            *counts.entry(ts.timestamp().div_euclid(width)).or_default() += 1;
        }

        let buckets = (0..len as i64)
            .filter_map(|i| {
                let idx = first + i;
                DateTime::from_timestamp(idx * width, 0).map(|start| Bucket {
                    start,
                    count: counts.get(&idx).copied().unwrap_or(0),
                })
            })
            .collect();

        Self {
            bucket_width_secs: width as u64,
            buckets,
        }
    }
}
