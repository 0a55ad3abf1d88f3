//! Volume Bucket Aggregation
//!
//! Groups trading days into equal-frequency volume buckets and reports the
//! mean simple return of each bucket.
//!
//! Bucket edges are the empirical volume quantiles at k/N, linearly
//! interpolated between order statistics. A day with volume `v` falls into
//! the bucket whose range is `[low, high)`; the last bucket also takes
//! `v == high`. When several edges coincide (many days sharing one volume)
//! the lower buckets of the tie are empty and their mean is NaN.

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::history::PriceSeries;
use crate::returns::ReturnSample;

/// Default number of volume buckets
pub const DEFAULT_BUCKETS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeBucket {
    pub range_low: f64,
    pub range_high: f64,
    /// NaN when no day fell into this bucket
    pub mean_return: f64,
    pub count: usize,
}

impl VolumeBucket {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `low-high` with both bounds rounded to four significant digits
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            round_significant(self.range_low, 4),
            round_significant(self.range_high, 4)
        )
    }
}

/// Partition the days of `series` into `num_buckets` volume quantile buckets
///
/// `returns[i]` must be the return ending on `series.bars()[i + 1]`, as
/// produced by [`crate::returns::compute`]. The first bar has no return and
/// takes no part in the bucketing.
pub fn bucketize(
    series: &PriceSeries,
    returns: &[ReturnSample],
    num_buckets: usize,
) -> AnalysisResult<Vec<VolumeBucket>> {
    if num_buckets == 0 {
        return Err(AnalysisError::invalid_parameter("num_buckets", "must be at least 1"));
    }

    let days = align(series, returns)?;
    if days.len() < num_buckets {
        return Err(AnalysisError::InsufficientData {
            required: num_buckets,
            actual: days.len(),
        });
    }

    let mut volumes: Vec<f64> = days.iter().map(|(v, _)| *v).collect();
    volumes.sort_by(|a, b| a.total_cmp(b));
    let edges: Vec<f64> = (0..=num_buckets)
        .map(|k| quantile(&volumes, k as f64 / num_buckets as f64))
        .collect();

    let interior = &edges[1..num_buckets];
    let mut sums = vec![0.0; num_buckets];
    let mut counts = vec![0usize; num_buckets];
    for (volume, ret) in days {
        let idx = interior.partition_point(|edge| *edge <= volume);
        sums[idx] += ret;
        counts[idx] += 1;
    }

    Ok(edges
        .windows(2)
        .zip(sums.into_iter().zip(counts))
        .map(|(range, (sum, count))| VolumeBucket {
            range_low: range[0],
            range_high: range[1],
            mean_return: if count == 0 { f64::NAN } else { sum / count as f64 },
            count,
        })
        .collect())
}

/// Pair each return with the volume of the bar it ends on
fn align(series: &PriceSeries, returns: &[ReturnSample]) -> AnalysisResult<Vec<(f64, f64)>> {
    let bars = series.bars();
    if returns.len() + 1 != bars.len() {
        return Err(AnalysisError::invalid_parameter(
            "returns",
            format!("expected {} returns for {} bars, got {}", bars.len().saturating_sub(1), bars.len(), returns.len()),
        ));
    }
    bars[1..]
        .iter()
        .zip(returns)
        .map(|(bar, ret)| {
            if bar.date != ret.date {
                return Err(AnalysisError::invalid_parameter(
                    "returns",
                    format!("return dated {} does not match bar dated {}", ret.date, bar.date),
                ));
            }
            Ok((bar.volume, ret.simple_return))
        })
        .collect()
}

/// Linear-interpolated quantile of sorted, non-empty data
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    if lo >= last {
        return sorted[last];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
}

fn round_significant(x: f64, digits: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor() as i32 + 1;
    let shift = digits - magnitude;
    if shift >= 0 {
        let factor = 10f64.powi(shift);
        (x * factor).round() / factor
    } else {
        let scale = 10f64.powi(-shift);
        (x / scale).round() * scale
    }
}
