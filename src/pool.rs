use crate::error::EvalResult;
use crate::fitness::Fitness;
use crate::keyspace::{Key, PermutationKeyspace};
use crate::oracle::normalised_levenshtein;
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A scored candidate decryption. Carries no oracle distance: pools are built
/// without the gold plaintext and labelled afterwards by [`label_pool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: Key,
    pub text: String,
    pub score: f64,
}

/// A candidate paired with its oracle distance to one gold plaintext.
#[derive(Debug, Clone, Copy)]
pub struct LabeledCandidate<'a> {
    pub candidate: &'a Candidate,
    pub oracle_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Uniform over the whole keyspace.
    Global,
    /// Union of swap-distance balls around `seeds` seed keys.
    Local { radius: usize, seeds: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub kind: PoolKind,
    pub candidates: Vec<Candidate>,
}

impl Pool {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Appends a candidate, e.g. the true-key decryption for diagnostics.
    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }
}

#[inline(always)]
fn score_key<F: Fitness + ?Sized>(
    ks: &PermutationKeyspace,
    ciphertext: &str,
    fitness: &F,
    key: Key,
) -> EvalResult<Candidate> {
    let text = ks.decrypt(ciphertext, &key)?;
    let score = fitness.score(&text);
    Ok(Candidate { key, text, score })
}

/// Decrypts `ciphertext` under `count` independent random keys and scores each.
pub fn build_global_pool<F: Fitness + ?Sized>(
    ks: &PermutationKeyspace,
    ciphertext: &str,
    fitness: &F,
    count: usize,
    rng: &mut Rng,
) -> EvalResult<Pool> {
    let mut candidates = Vec::with_capacity(count);
    for _ in 0..count {
        let key = ks.random_key(rng);
        candidates.push(score_key(ks, ciphertext, fitness, key)?);
    }
    debug!("Global pool: {} candidates", candidates.len());

    Ok(Pool {
        kind: PoolKind::Global,
        candidates,
    })
}

/// Builds balls of radius `radius` around `true_key` plus `seed_count - 1`
/// random seeds.
///
/// Each seed contributes itself and, for every `d` in `1..=radius`,
/// `per_seed` neighbours drawn with `neighbour_by_swaps(seed, d)`; neighbours
/// that collapse back onto their seed are discarded. Overlapping balls keep
/// enough close pairs available at every radius for the mutual-distance
/// filter applied later.
#[allow(clippy::too_many_arguments)]
pub fn build_local_pool<F: Fitness + ?Sized>(
    ks: &PermutationKeyspace,
    true_key: &Key,
    ciphertext: &str,
    fitness: &F,
    radius: usize,
    per_seed: usize,
    seed_count: usize,
    rng: &mut Rng,
) -> EvalResult<Pool> {
    ks.validate_key(true_key)?;

    let mut seeds = Vec::with_capacity(seed_count.max(1));
    seeds.push(true_key.clone());
    for _ in 1..seed_count {
        seeds.push(ks.random_key(rng));
    }

    let mut candidates = Vec::with_capacity(seeds.len() * (1 + radius * per_seed));
    let mut collapsed = 0usize;
    for seed in &seeds {
        // The seed itself, so radius 1 has seed/neighbour pairs.
        candidates.push(score_key(ks, ciphertext, fitness, seed.clone())?);

        for d in 1..=radius {
            for _ in 0..per_seed {
                let key = ks.neighbour_by_swaps(seed, d, rng);
                if &key == seed {
                    collapsed += 1;
                    continue;
                }
                candidates.push(score_key(ks, ciphertext, fitness, key)?);
            }
        }
    }
    debug!(
        "Local pool r={}: {} candidates from {} seeds ({} collapsed neighbours dropped)",
        radius,
        candidates.len(),
        seeds.len(),
        collapsed
    );

    Ok(Pool {
        kind: PoolKind::Local {
            radius,
            seeds: seeds.len(),
        },
        candidates,
    })
}

/// Attaches the oracle distance to `gold` to every candidate of `pool`.
pub fn label_pool<'a>(pool: &'a Pool, gold: &str) -> Vec<LabeledCandidate<'a>> {
    pool.candidates
        .iter()
        .map(|candidate| LabeledCandidate {
            candidate,
            oracle_distance: normalised_levenshtein(&candidate.text, gold),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::UnigramFitness;

    const PLAIN: &str = "thequickbrownfoxjumpsoverthelazydog";

    #[test]
    fn test_global_pool_size_and_scores() {
        let ks = PermutationKeyspace::default();
        let mut rng = Rng::with_seed(11);
        let fitness = UnigramFitness::english();
        let key = ks.random_key(&mut rng);
        let ct = ks.encrypt(PLAIN, &key).unwrap();

        let pool = build_global_pool(&ks, &ct, &fitness, 40, &mut rng).unwrap();
        assert_eq!(pool.len(), 40);
        assert_eq!(pool.kind, PoolKind::Global);
        for c in &pool.candidates {
            assert_eq!(c.text, ks.decrypt(&ct, &c.key).unwrap());
            assert_eq!(c.score, fitness.score(&c.text));
        }
    }

    #[test]
    fn test_local_pool_contains_true_key_first() {
        let ks = PermutationKeyspace::default();
        let mut rng = Rng::with_seed(12);
        let fitness = UnigramFitness::english();
        let key = ks.random_key(&mut rng);
        let ct = ks.encrypt(PLAIN, &key).unwrap();

        let pool = build_local_pool(&ks, &key, &ct, &fitness, 2, 5, 3, &mut rng).unwrap();
        assert_eq!(pool.candidates[0].key, key);
        assert_eq!(pool.candidates[0].text, PLAIN);
        assert_eq!(pool.kind, PoolKind::Local { radius: 2, seeds: 3 });
        // 3 seeds * (1 + 2 * 5) minus collapsed radius-2 neighbours.
        assert!(pool.len() <= 33);
        assert!(pool.len() >= 3 + 3 * 5);
    }

    #[test]
    fn test_single_seed_neighbours_stay_in_ball() {
        let ks = PermutationKeyspace::default();
        let mut rng = Rng::with_seed(14);
        let key = ks.random_key(&mut rng);
        let ct = ks.encrypt(PLAIN, &key).unwrap();

        let pool = build_local_pool(&ks, &key, &ct, &UnigramFitness::english(), 3, 50, 1, &mut rng)
            .unwrap();
        assert_eq!(pool.candidates[0].key, key);
        assert!(pool.len() > 1 && pool.len() <= 1 + 3 * 50);
        for c in &pool.candidates[1..] {
            let d = ks.swap_distance(&key, &c.key).unwrap();
            // Zero would mean a collapsed neighbour slipped through.
            assert!((1..=3).contains(&d), "neighbour at distance {}", d);
        }
    }

    #[test]
    fn test_multi_seed_candidates_reachable_from_a_seed() {
        let ks = PermutationKeyspace::default();
        let mut rng = Rng::with_seed(15);
        let key = ks.random_key(&mut rng);
        let ct = ks.encrypt(PLAIN, &key).unwrap();

        // Seeds are drawn first, so a cloned generator replays them.
        let mut replay = rng.clone();
        let mut seeds = vec![key.clone()];
        seeds.extend((1..4).map(|_| ks.random_key(&mut replay)));

        let (radius, per_seed) = (2, 25);
        let pool = build_local_pool(
            &ks,
            &key,
            &ct,
            &UnigramFitness::english(),
            radius,
            per_seed,
            seeds.len(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(pool.kind, PoolKind::Local { radius, seeds: 4 });
        assert!(pool.len() <= seeds.len() * (1 + radius * per_seed));
        let mut seed_hits = 0;
        for c in &pool.candidates {
            let nearest = seeds
                .iter()
                .map(|s| ks.swap_distance(s, &c.key).unwrap())
                .min()
                .unwrap();
            assert!(nearest <= radius);
            if nearest == 0 {
                seed_hits += 1;
            }
        }
        // Each seed appears once; none of its neighbours collapse back onto it.
        assert_eq!(seed_hits, seeds.len());
    }

    #[test]
    fn test_labels_do_not_mutate_pool() {
        let ks = PermutationKeyspace::default();
        let mut rng = Rng::with_seed(13);
        let key = ks.random_key(&mut rng);
        let ct = ks.encrypt(PLAIN, &key).unwrap();
        let pool =
            build_local_pool(&ks, &key, &ct, &UnigramFitness::english(), 1, 4, 1, &mut rng)
                .unwrap();

        let against_plain = label_pool(&pool, PLAIN);
        let against_cipher = label_pool(&pool, &ct);
        assert_eq!(against_plain[0].oracle_distance, 0.0);
        assert!(against_cipher[0].oracle_distance > 0.0);
        assert_eq!(against_plain.len(), pool.len());
    }
}
