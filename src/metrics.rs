//! Ranking-quality metrics over `(label, score)` columns.
//!
//! Undefined results (empty input, a single label class, no eligible pairs)
//! are `None` rather than NaN so they survive aggregation explicitly.

use crate::error::{EvalError, EvalResult};
use fastrand::Rng;
use serde::{Deserialize, Serialize};

/// Rank-based AUC (Mann-Whitney U) of `scores` separating `true` labels from
/// `false` labels. Tied scores share their mid rank, so a fully tied input
/// scores 0.5.
pub fn auc_from_pairs(labels: &[bool], scores: &[f64]) -> Option<f64> {
    debug_assert_eq!(labels.len(), scores.len());
    let n = labels.len().min(scores.len());
    if n == 0 {
        return None;
    }

    let n_pos = labels[..n].iter().filter(|&&l| l).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // Positions i..j hold ranks i+1..=j.
        let mid_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            if labels[idx] {
                rank_sum_pos += mid_rank;
            }
        }
        i = j;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// Pairwise accuracy at decision threshold zero.
///
/// A pair is correct when `diff > 0` with label `true` or `diff < 0` with
/// label `false`. Zero diffs count in neither numerator nor denominator.
pub fn tpr_at_zero(labels: &[bool], diffs: &[f64]) -> Option<f64> {
    let mut correct = 0usize;
    let mut total = 0usize;
    for (&label, &diff) in labels.iter().zip(diffs) {
        if diff == 0.0 || diff.is_nan() {
            continue;
        }
        total += 1;
        if (diff > 0.0) == label {
            correct += 1;
        }
    }

    if total == 0 {
        None
    } else {
        Some(correct as f64 / total as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AucInterval {
    /// AUC on the unresampled data.
    pub auc: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Resamples that produced a defined AUC.
    pub resamples: usize,
}

impl AucInterval {
    pub fn undefined() -> Self {
        Self {
            auc: None,
            lower: None,
            upper: None,
            resamples: 0,
        }
    }

    pub fn width(&self) -> Option<f64> {
        Some(self.upper? - self.lower?)
    }
}

/// Nonparametric bootstrap interval for [`auc_from_pairs`].
///
/// Resamples the pairs with replacement `iterations` times, drops resamples
/// whose AUC is undefined, and returns the `(alpha/2, 1 - alpha/2)` quantiles
/// (linear interpolation). Degenerate input yields
/// [`AucInterval::undefined`].
pub fn bootstrap_auc_ci(
    labels: &[bool],
    diffs: &[f64],
    iterations: usize,
    alpha: f64,
    rng: &mut Rng,
) -> EvalResult<AucInterval> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(EvalError::Config(format!(
            "bootstrap alpha must lie in (0, 1), got {}",
            alpha
        )));
    }

    let auc = match auc_from_pairs(labels, diffs) {
        Some(a) => a,
        None => return Ok(AucInterval::undefined()),
    };

    let n = labels.len().min(diffs.len());
    let mut sample_labels = vec![false; n];
    let mut sample_diffs = vec![0.0; n];
    let mut aucs = Vec::with_capacity(iterations);

    for _ in 0..iterations {
        for k in 0..n {
            let idx = rng.usize(0..n);
            sample_labels[k] = labels[idx];
            sample_diffs[k] = diffs[idx];
        }
        if let Some(a) = auc_from_pairs(&sample_labels, &sample_diffs) {
            aucs.push(a);
        }
    }

    // No defined resample leaves both bounds at None.
    aucs.sort_unstable_by(|a, b| a.total_cmp(b));
    Ok(AucInterval {
        auc: Some(auc),
        lower: quantile_sorted(&aucs, alpha / 2.0),
        upper: quantile_sorted(&aucs, 1.0 - alpha / 2.0),
        resamples: aucs.len(),
    })
}

/// Linear-interpolated quantile of an ascending slice; `None` when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let q = q.clamp(0.0, 1.0);
    let idx = q * last as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let t = idx - lo as f64;
        Some(sorted[lo] * (1.0 - t) + sorted[hi] * t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Scores `>= threshold` are classified positive. The first point uses
    /// `+inf` (nothing positive).
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Trapezoidal area under the curve.
    pub fn area(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum()
    }
}

/// ROC operating points at every distinct score, from `(0, 0)` to `(1, 1)`.
/// `None` under the same conditions as [`auc_from_pairs`].
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Option<RocCurve> {
    let n = labels.len().min(scores.len());
    let n_pos = labels[..n].iter().filter(|&&l| l).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = Vec::with_capacity(n + 1);
    points.push(RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < n {
        let threshold = scores[order[i]];
        let mut j = i;
        while j < n && scores[order[j]] == threshold {
            if labels[order[j]] {
                tp += 1;
            } else {
                fp += 1;
            }
            j += 1;
        }
        // NaN never compares equal; consume it as its own group.
        if j == i {
            if labels[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            j = i + 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / n_neg as f64,
            tpr: tp as f64 / n_pos as f64,
            threshold,
        });
        i = j;
    }

    Some(RocCurve { points })
}

/// Mean of the defined values; `None` only if every value is undefined.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
