use crate::error::EvalResult;
use crate::keyspace::PermutationKeyspace;
use crate::pool::{label_pool, LabeledCandidate, Pool};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Above this pool size pairs are never enumerated exhaustively.
pub const ENUMERATION_LIMIT: usize = 2000;

/// Rejection sampling gives up after this many draws per requested pair.
pub const ATTEMPTS_PER_PAIR: usize = 10;

/// One ranking comparison. `label` is true iff the first candidate is closer
/// to gold; `score_diff` is `score(first) - score(second)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseExample {
    pub label: bool,
    pub score_diff: f64,
}

/// Labels and score differences kept as parallel columns so the metric
/// functions can consume them directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDataset {
    pub labels: Vec<bool>,
    pub diffs: Vec<f64>,
}

impl PairwiseDataset {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            labels: Vec::with_capacity(n),
            diffs: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, example: PairwiseExample) {
        self.labels.push(example.label);
        self.diffs.push(example.score_diff);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    pub fn negatives(&self) -> usize {
        self.len() - self.positives()
    }

    pub fn examples(&self) -> impl Iterator<Item = PairwiseExample> + '_ {
        self.labels
            .iter()
            .zip(&self.diffs)
            .map(|(&label, &score_diff)| PairwiseExample { label, score_diff })
    }
}

/// Up to `max_pairs` distinct unordered pairs `(i, j)` with `i < j < n`.
///
/// Small pools whose request covers at least half of all pairs are enumerated,
/// shuffled and truncated. Otherwise pairs are drawn uniformly with at most
/// `ATTEMPTS_PER_PAIR * max_pairs` draws, so the result may be short when the
/// request approaches the number of possible pairs. Order is a function of the
/// generator state only.
pub fn sample_pair_indices(n: usize, max_pairs: usize, rng: &mut Rng) -> Vec<(usize, usize)> {
    if n < 2 || max_pairs == 0 {
        return Vec::new();
    }

    let total = n * (n - 1) / 2;
    if n <= ENUMERATION_LIMIT && max_pairs.saturating_mul(2) >= total {
        let mut pairs = Vec::with_capacity(total);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        rng.shuffle(&mut pairs);
        pairs.truncate(max_pairs);
        return pairs;
    }

    let target = max_pairs.min(total);
    let max_attempts = max_pairs.saturating_mul(ATTEMPTS_PER_PAIR);
    let mut seen = HashSet::with_capacity(target);
    let mut pairs = Vec::with_capacity(target);
    let mut attempts = 0;

    while pairs.len() < target && attempts < max_attempts {
        attempts += 1;
        let a = rng.usize(0..n);
        let mut b = rng.usize(0..n - 1);
        if b >= a {
            b += 1;
        }
        let pair = if a < b { (a, b) } else { (b, a) };
        if seen.insert(pair) {
            pairs.push(pair);
        }
    }

    if pairs.len() < target {
        debug!(
            "Pair sampler stopped at {} of {} pairs after {} attempts",
            pairs.len(),
            target,
            attempts
        );
    }
    pairs
}

/// Turns a pool into labelled score-difference examples against `gold`.
///
/// With `radius_cap = Some(r)` only pairs whose two keys are within swap
/// distance `r` of each other survive. This is a mutual constraint: two
/// candidates from different seeds' balls are dropped even if each is within
/// `r` of its own seed. Pairs with equal oracle distance are dropped. Stops
/// once `max_pairs` examples are accepted.
pub fn build_pairwise_dataset(
    ks: &PermutationKeyspace,
    pool: &Pool,
    gold: &str,
    max_pairs: usize,
    radius_cap: Option<usize>,
    rng: &mut Rng,
) -> EvalResult<PairwiseDataset> {
    let labelled = label_pool(pool, gold);
    build_pairwise_from_labels(ks, &labelled, max_pairs, radius_cap, rng)
}

/// [`build_pairwise_dataset`] over a pool already labelled by
/// [`label_pool`], for callers that reuse the oracle distances.
pub fn build_pairwise_from_labels(
    ks: &PermutationKeyspace,
    labelled: &[LabeledCandidate<'_>],
    max_pairs: usize,
    radius_cap: Option<usize>,
    rng: &mut Rng,
) -> EvalResult<PairwiseDataset> {
    let mut dataset = PairwiseDataset::with_capacity(max_pairs.min(labelled.len() * 4));
    if labelled.len() < 2 {
        return Ok(dataset);
    }

    let mut capped = 0usize;
    let mut ties = 0usize;
    for (i, j) in sample_pair_indices(labelled.len(), max_pairs, rng) {
        let first = &labelled[i];
        let second = &labelled[j];

        if let Some(cap) = radius_cap {
            if ks.swap_distance(&first.candidate.key, &second.candidate.key)? > cap {
                capped += 1;
                continue;
            }
        }

        if first.oracle_distance == second.oracle_distance {
            ties += 1;
            continue;
        }

        dataset.push(PairwiseExample {
            label: first.oracle_distance < second.oracle_distance,
            score_diff: first.candidate.score - second.candidate.score,
        });
        if dataset.len() >= max_pairs {
            break;
        }
    }

    debug!(
        "Pairwise dataset: {} examples ({} positive), {} over cap, {} oracle ties",
        dataset.len(),
        dataset.positives(),
        capped,
        ties
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::Key;
    use crate::pool::{Candidate, PoolKind};
    use rstest::rstest;

    fn assert_valid_pairs(pairs: &[(usize, usize)], n: usize) {
        let mut seen = HashSet::new();
        for &(i, j) in pairs {
            assert!(i < j, "pair ({}, {}) not ordered", i, j);
            assert!(j < n, "pair ({}, {}) out of range", i, j);
            assert!(seen.insert((i, j)), "duplicate pair ({}, {})", i, j);
        }
    }

    #[test]
    fn test_small_n_enumerates_all_pairs() {
        let mut rng = Rng::with_seed(4);
        let pairs = sample_pair_indices(4, 10, &mut rng);
        assert_eq!(pairs.len(), 6);
        assert_valid_pairs(&pairs, 4);
    }

    #[rstest]
    #[case(0, 5)]
    #[case(1, 5)]
    #[case(10, 0)]
    fn test_degenerate_requests(#[case] n: usize, #[case] max_pairs: usize) {
        let mut rng = Rng::with_seed(4);
        assert!(sample_pair_indices(n, max_pairs, &mut rng).is_empty());
    }

    #[rstest]
    #[case(50, 100)]
    #[case(3000, 5000)]
    #[case(40, 780)]
    fn test_sampled_pairs_are_distinct(#[case] n: usize, #[case] max_pairs: usize) {
        let mut rng = Rng::with_seed(n as u64);
        let pairs = sample_pair_indices(n, max_pairs, &mut rng);
        assert!(pairs.len() <= max_pairs);
        assert_valid_pairs(&pairs, n);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let a = sample_pair_indices(500, 300, &mut Rng::with_seed(8));
        let b = sample_pair_indices(500, 300, &mut Rng::with_seed(8));
        assert_eq!(a, b);
        assert_eq!(a.len(), 300);
    }

    fn manual_pool(ks: &PermutationKeyspace, texts: &[(&str, f64)]) -> Pool {
        let mut rng = Rng::with_seed(0);
        Pool {
            kind: PoolKind::Global,
            candidates: texts
                .iter()
                .map(|&(t, s)| Candidate {
                    key: ks.random_key(&mut rng),
                    text: t.to_string(),
                    score: s,
                })
                .collect(),
        }
    }

    #[test]
    fn test_labels_and_diffs() {
        let ks = PermutationKeyspace::new(crate::alphabet::Alphabet::new("abcd").unwrap());
        let pool = manual_pool(&ks, &[("abcd", 5.0), ("abcc", 3.0), ("dcba", 1.0)]);
        let mut rng = Rng::with_seed(2);
        let ds = build_pairwise_dataset(&ks, &pool, "abcd", 10, None, &mut rng).unwrap();

        assert_eq!(ds.len(), 3);
        for ex in ds.examples() {
            // Closer candidates carry the higher score in this pool.
            assert_eq!(ex.label, ex.score_diff > 0.0);
        }
    }

    #[test]
    fn test_ties_are_dropped() {
        let ks = PermutationKeyspace::new(crate::alphabet::Alphabet::new("abcd").unwrap());
        let pool = manual_pool(&ks, &[("abca", 1.0), ("abcb", 2.0), ("abcc", 3.0)]);
        let mut rng = Rng::with_seed(2);
        let ds = build_pairwise_dataset(&ks, &pool, "abcd", 10, None, &mut rng).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn test_radius_cap_is_mutual() {
        let ks = PermutationKeyspace::new(crate::alphabet::Alphabet::new("abcde").unwrap());
        let pool = Pool {
            kind: PoolKind::Local { radius: 1, seeds: 1 },
            candidates: vec![
                Candidate {
                    key: Key::from("abcde"),
                    text: "abcde".into(),
                    score: 0.0,
                },
                Candidate {
                    key: Key::from("bacde"),
                    text: "bacde".into(),
                    score: 0.0,
                },
                Candidate {
                    key: Key::from("abdce"),
                    text: "abdcx".into(),
                    score: 0.0,
                },
            ],
        };
        let mut rng = Rng::with_seed(2);
        // Both neighbours are one swap from the seed but two swaps apart.
        let ds = build_pairwise_dataset(&ks, &pool, "abcde", 10, Some(1), &mut rng).unwrap();
        assert_eq!(ds.len(), 2);
        let ds = build_pairwise_dataset(&ks, &pool, "abcde", 10, Some(2), &mut rng).unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_prelabelled_pool_gives_same_dataset() {
        let ks = PermutationKeyspace::default();
        let texts: Vec<(String, f64)> = (0..40)
            .map(|i| ("ab".repeat(i % 7 + 1), (i * 13 % 11) as f64))
            .collect();
        let refs: Vec<(&str, f64)> = texts.iter().map(|(t, s)| (t.as_str(), *s)).collect();
        let pool = manual_pool(&ks, &refs);

        let direct =
            build_pairwise_dataset(&ks, &pool, "abab", 300, None, &mut Rng::with_seed(5)).unwrap();
        let labelled = label_pool(&pool, "abab");
        let reused =
            build_pairwise_from_labels(&ks, &labelled, 300, None, &mut Rng::with_seed(5)).unwrap();
        assert!(!direct.is_empty());
        assert_eq!(direct, reused);
    }

    #[test]
    fn test_max_pairs_respected() {
        let ks = PermutationKeyspace::default();
        let texts: Vec<(String, f64)> = (0..30)
            .map(|i| ("a".repeat(i + 5), i as f64))
            .collect();
        let refs: Vec<(&str, f64)> = texts.iter().map(|(t, s)| (t.as_str(), *s)).collect();
        let pool = manual_pool(&ks, &refs);
        let mut rng = Rng::with_seed(9);
        // Lengths 5..35 give strictly increasing oracle distances, so no ties.
        let ds = build_pairwise_dataset(&ks, &pool, "aaaaa", 25, None, &mut rng).unwrap();
        assert_eq!(ds.len(), 25);
    }
}
