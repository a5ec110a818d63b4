use crate::alphabet::Alphabet;
use crate::config::{BatchParams, EvaluationParams};
use crate::error::{EvalError, EvalResult};
use crate::fitness::Fitness;
use crate::keyspace::{Key, PermutationKeyspace};
use crate::metrics::{
    auc_from_pairs, bootstrap_auc_ci, mean_defined, roc_curve, tpr_at_zero, AucInterval, RocCurve,
};
use crate::oracle::normalised_levenshtein;
use crate::pairwise::{build_pairwise_dataset, build_pairwise_from_labels};
use crate::pool::{
    build_global_pool, build_local_pool, label_pool, Candidate, LabeledCandidate, Pool,
};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Bootstrap resamples used by [`Evaluator::roc_panel`] when the parameters
/// leave the bootstrap disabled.
pub const DEFAULT_PANEL_BOOTSTRAP: usize = 500;

/// Metrics for one scope (the global pool or one local radius).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    pub pair_count: usize,
    pub positives: usize,
    pub auc: Option<f64>,
    pub tpr_at_zero: Option<f64>,
    /// AUC of raw score separating the exact plaintext from every other
    /// candidate in the pool.
    pub true_vs_rest_auc: Option<f64>,
    pub auc_ci: Option<AucInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub global: ScopeMetrics,
    /// Keyed by local radius.
    pub local: BTreeMap<usize, ScopeMetrics>,
    pub true_key: Key,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextReport {
    pub id: usize,
    /// Plaintext length in symbols.
    pub len: usize,
    pub report: EvaluationReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalMacro {
    pub auc: Option<f64>,
    pub tpr_at_zero: Option<f64>,
    pub true_vs_rest_auc: Option<f64>,
    /// Texts that reported this radius.
    pub texts: usize,
}

/// Equal-weight means across texts; undefined per-text values are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroAverages {
    pub global_auc: Option<f64>,
    pub global_tpr_at_zero: Option<f64>,
    pub global_true_vs_rest_auc: Option<f64>,
    pub local: BTreeMap<usize, LocalMacro>,
}

impl MacroAverages {
    pub fn from_reports(per_text: &[TextReport]) -> Self {
        let reports = || per_text.iter().map(|t| &t.report);

        let mut radii: Vec<usize> = reports().flat_map(|r| r.local.keys().copied()).collect();
        radii.sort_unstable();
        radii.dedup();

        let local = radii
            .into_iter()
            .map(|radius| {
                let scoped: Vec<&ScopeMetrics> =
                    reports().filter_map(|r| r.local.get(&radius)).collect();
                let summary = LocalMacro {
                    auc: mean_defined(scoped.iter().map(|m| m.auc)),
                    tpr_at_zero: mean_defined(scoped.iter().map(|m| m.tpr_at_zero)),
                    true_vs_rest_auc: mean_defined(scoped.iter().map(|m| m.true_vs_rest_auc)),
                    texts: scoped.len(),
                };
                (radius, summary)
            })
            .collect();

        Self {
            global_auc: mean_defined(reports().map(|r| r.global.auc)),
            global_tpr_at_zero: mean_defined(reports().map(|r| r.global.tpr_at_zero)),
            global_true_vs_rest_auc: mean_defined(reports().map(|r| r.global.true_vs_rest_auc)),
            local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub aggregate: MacroAverages,
    pub per_text: Vec<TextReport>,
}

/// ROC data and bootstrap interval for one scope, ready for external plotting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeRoc {
    pub pair_count: usize,
    pub curve: Option<RocCurve>,
    pub interval: AucInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocPanel {
    pub global: ScopeRoc,
    pub local: BTreeMap<usize, ScopeRoc>,
    pub true_key: Key,
}

/// Evaluates fitness functions against substitution ciphertexts.
///
/// Owns the only generator used for key drawing, pool sampling, pair sampling
/// and bootstrap resampling. Two evaluators built with the same seed produce
/// identical reports for a deterministic fitness.
pub struct Evaluator {
    keyspace: PermutationKeyspace,
    params: EvaluationParams,
    rng: Rng,
}

impl Evaluator {
    pub fn new(alphabet: Alphabet, params: EvaluationParams, seed: Option<u64>) -> EvalResult<Self> {
        params.validate()?;
        let rng = if let Some(s) = seed {
            Rng::with_seed(s)
        } else {
            Rng::new()
        };

        Ok(Self {
            keyspace: PermutationKeyspace::new(alphabet),
            params,
            rng,
        })
    }

    pub fn keyspace(&self) -> &PermutationKeyspace {
        &self.keyspace
    }

    pub fn params(&self) -> &EvaluationParams {
        &self.params
    }

    /// Draws a true key, encrypts `plaintext`, and measures how well `fitness`
    /// ranks candidate decryptions globally and within each local radius.
    pub fn evaluate<F: Fitness + ?Sized>(
        &mut self,
        plaintext: &str,
        fitness: &F,
    ) -> EvalResult<EvaluationReport> {
        let true_key = self.keyspace.random_key(&mut self.rng);
        let ciphertext = self.keyspace.encrypt(plaintext, &true_key)?;
        let true_candidate = if self.params.include_true_key_diagnostic {
            Some(self.true_candidate(&ciphertext, &true_key, fitness)?)
        } else {
            None
        };

        let global_pool = build_global_pool(
            &self.keyspace,
            &ciphertext,
            fitness,
            self.params.global_num_keys,
            &mut self.rng,
        )?;
        let global = self.scope_metrics(
            &global_pool,
            plaintext,
            self.params.global_max_pairs,
            None,
            true_candidate.as_ref(),
        )?;

        let mut local = BTreeMap::new();
        for radius in self.params.local_radii.clone() {
            let pool = self.local_pool(&true_key, &ciphertext, fitness, radius)?;
            let metrics = self.scope_metrics(
                &pool,
                plaintext,
                self.params.local_max_pairs,
                Some(radius),
                true_candidate.as_ref(),
            )?;
            debug!(
                "r={}: {} pairs, AUC {:?}, acc@0 {:?}",
                radius, metrics.pair_count, metrics.auc, metrics.tpr_at_zero
            );
            local.insert(radius, metrics);
        }

        info!(
            "Evaluated {} symbols: global AUC {:?}, acc@0 {:?} over {} pairs",
            plaintext.chars().count(),
            global.auc,
            global.tpr_at_zero,
            global.pair_count
        );

        Ok(EvaluationReport {
            global,
            local,
            true_key,
        })
    }

    /// Evaluates the first `batch.max_texts` plaintexts of at least
    /// `batch.min_len` symbols and macro-averages their metrics.
    ///
    /// Consumes only as much of `plaintexts` as needed. Fails with
    /// [`EvalError::InsufficientData`] if the source runs dry first.
    pub fn evaluate_many<I, S, F>(
        &mut self,
        plaintexts: I,
        fitness: &F,
        batch: &BatchParams,
    ) -> EvalResult<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fitness + ?Sized,
    {
        let texts: Vec<S> = plaintexts
            .into_iter()
            .filter(|p| p.as_ref().chars().count() >= batch.min_len)
            .take(batch.max_texts)
            .collect();

        if texts.len() < batch.max_texts {
            return Err(EvalError::InsufficientData {
                found: texts.len(),
                requested: batch.max_texts,
                min_len: batch.min_len,
            });
        }

        let mut per_text = Vec::with_capacity(texts.len());
        for (id, text) in texts.iter().enumerate() {
            let plain = text.as_ref();
            info!("📝 Text {}/{}", id + 1, texts.len());
            let report = self.evaluate(plain, fitness)?;
            per_text.push(TextReport {
                id,
                len: plain.chars().count(),
                report,
            });
        }

        let aggregate = MacroAverages::from_reports(&per_text);
        info!(
            "Batch of {}: macro global AUC {:?}, acc@0 {:?}",
            per_text.len(),
            aggregate.global_auc,
            aggregate.global_tpr_at_zero
        );

        Ok(BatchReport {
            aggregate,
            per_text,
        })
    }

    /// ROC curves and bootstrap AUC intervals for the global scope and each
    /// local radius of one plaintext.
    pub fn roc_panel<F: Fitness + ?Sized>(
        &mut self,
        plaintext: &str,
        fitness: &F,
    ) -> EvalResult<RocPanel> {
        let iterations = match self.params.bootstrap_iterations {
            0 => DEFAULT_PANEL_BOOTSTRAP,
            n => n,
        };

        let true_key = self.keyspace.random_key(&mut self.rng);
        let ciphertext = self.keyspace.encrypt(plaintext, &true_key)?;

        let global_pool = build_global_pool(
            &self.keyspace,
            &ciphertext,
            fitness,
            self.params.global_num_keys,
            &mut self.rng,
        )?;
        let global = self.scope_roc(
            &global_pool,
            plaintext,
            self.params.global_max_pairs,
            None,
            iterations,
        )?;

        let mut local = BTreeMap::new();
        for radius in self.params.local_radii.clone() {
            let pool = self.local_pool(&true_key, &ciphertext, fitness, radius)?;
            let roc = self.scope_roc(
                &pool,
                plaintext,
                self.params.local_max_pairs,
                Some(radius),
                iterations,
            )?;
            local.insert(radius, roc);
        }

        Ok(RocPanel {
            global,
            local,
            true_key,
        })
    }

    fn true_candidate<F: Fitness + ?Sized>(
        &self,
        ciphertext: &str,
        true_key: &Key,
        fitness: &F,
    ) -> EvalResult<Candidate> {
        let text = self.keyspace.decrypt(ciphertext, true_key)?;
        let score = fitness.score(&text);
        Ok(Candidate {
            key: true_key.clone(),
            text,
            score,
        })
    }

    fn local_pool<F: Fitness + ?Sized>(
        &mut self,
        true_key: &Key,
        ciphertext: &str,
        fitness: &F,
        radius: usize,
    ) -> EvalResult<Pool> {
        build_local_pool(
            &self.keyspace,
            true_key,
            ciphertext,
            fitness,
            radius,
            self.params.local_per_seed,
            self.params.local_seeds,
            &mut self.rng,
        )
    }

    fn scope_metrics(
        &mut self,
        pool: &Pool,
        gold: &str,
        max_pairs: usize,
        radius_cap: Option<usize>,
        true_candidate: Option<&Candidate>,
    ) -> EvalResult<ScopeMetrics> {
        let labelled = label_pool(pool, gold);
        let dataset = build_pairwise_from_labels(
            &self.keyspace,
            &labelled,
            max_pairs,
            radius_cap,
            &mut self.rng,
        )?;

        let auc_ci = if self.params.bootstrap_iterations > 0 {
            Some(bootstrap_auc_ci(
                &dataset.labels,
                &dataset.diffs,
                self.params.bootstrap_iterations,
                self.params.bootstrap_alpha,
                &mut self.rng,
            )?)
        } else {
            None
        };

        Ok(ScopeMetrics {
            pair_count: dataset.len(),
            positives: dataset.positives(),
            auc: auc_from_pairs(&dataset.labels, &dataset.diffs),
            tpr_at_zero: tpr_at_zero(&dataset.labels, &dataset.diffs),
            true_vs_rest_auc: true_candidate.and_then(|tc| true_vs_rest_auc(&labelled, tc, gold)),
            auc_ci,
        })
    }

    fn scope_roc(
        &mut self,
        pool: &Pool,
        gold: &str,
        max_pairs: usize,
        radius_cap: Option<usize>,
        iterations: usize,
    ) -> EvalResult<ScopeRoc> {
        let dataset =
            build_pairwise_dataset(&self.keyspace, pool, gold, max_pairs, radius_cap, &mut self.rng)?;
        let interval = bootstrap_auc_ci(
            &dataset.labels,
            &dataset.diffs,
            iterations,
            self.params.bootstrap_alpha,
            &mut self.rng,
        )?;

        Ok(ScopeRoc {
            pair_count: dataset.len(),
            curve: roc_curve(&dataset.labels, &dataset.diffs),
            interval,
        })
    }
}

/// Labels a labelled pool plus the true-key candidate by "decrypts exactly to
/// gold" and scores that split with the raw fitness. `None` unless both
/// classes occur.
pub fn true_vs_rest_auc(
    labelled: &[LabeledCandidate<'_>],
    true_candidate: &Candidate,
    gold: &str,
) -> Option<f64> {
    let mut labels = Vec::with_capacity(labelled.len() + 1);
    let mut scores = Vec::with_capacity(labelled.len() + 1);

    for lc in labelled {
        labels.push(lc.oracle_distance == 0.0);
        scores.push(lc.candidate.score);
    }
    labels.push(normalised_levenshtein(&true_candidate.text, gold) == 0.0);
    scores.push(true_candidate.score);

    auc_from_pairs(&labels, &scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::UnigramFitness;
    use crate::pool::PoolKind;

    fn small_params() -> EvaluationParams {
        EvaluationParams::builder()
            .global_num_keys(60)
            .global_max_pairs(500)
            .local_radii(vec![1, 2])
            .local_seeds(2)
            .local_per_seed(10)
            .local_max_pairs(500)
            .build()
    }

    fn scope(auc: Option<f64>) -> ScopeMetrics {
        ScopeMetrics {
            pair_count: 0,
            positives: 0,
            auc,
            tpr_at_zero: auc,
            true_vs_rest_auc: None,
            auc_ci: None,
        }
    }

    #[test]
    fn test_macro_average_skips_undefined() {
        let mk = |id, global, local: Vec<(usize, Option<f64>)>| TextReport {
            id,
            len: 10,
            report: EvaluationReport {
                global: scope(global),
                local: local.into_iter().map(|(r, a)| (r, scope(a))).collect(),
                true_key: Key::from("ab"),
            },
        };
        let reports = vec![
            mk(0, Some(0.8), vec![(1, Some(0.6)), (2, None)]),
            mk(1, None, vec![(1, Some(0.4))]),
            mk(2, Some(0.6), vec![(3, None)]),
        ];

        let agg = MacroAverages::from_reports(&reports);
        assert!((agg.global_auc.unwrap() - 0.7).abs() < 1e-12);
        assert!((agg.local[&1].auc.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(agg.local[&1].texts, 2);
        assert_eq!(agg.local[&2].auc, None);
        assert_eq!(agg.local[&3].texts, 1);
        assert_eq!(agg.global_true_vs_rest_auc, None);
    }

    #[test]
    fn test_true_vs_rest_requires_both_classes() {
        let c = |t: &str, s| Candidate {
            key: Key::from("ab"),
            text: t.into(),
            score: s,
        };
        let pool = Pool {
            kind: PoolKind::Global,
            candidates: vec![c("xx", 1.0), c("yy", 2.0)],
        };
        let labelled = label_pool(&pool, "ab");
        let auc = true_vs_rest_auc(&labelled, &c("ab", 5.0), "ab");
        assert_eq!(auc, Some(1.0));
        // The true candidate alone cannot form two classes if it misses gold.
        assert_eq!(true_vs_rest_auc(&labelled, &c("zz", 5.0), "ab"), None);
    }

    #[test]
    fn test_report_covers_each_radius() {
        let mut ev = Evaluator::new(Alphabet::latin(), small_params(), Some(3)).unwrap();
        let plain = "itwasthebestoftimesitwastheworstoftimesitwastheageofwisdom";
        let report = ev.evaluate(plain, &UnigramFitness::english()).unwrap();

        assert_eq!(report.local.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(report.global.pair_count > 0);
        assert!(report.global.auc_ci.is_none());
        let ct = ev.keyspace().encrypt(plain, &report.true_key).unwrap();
        assert_eq!(ev.keyspace().decrypt(&ct, &report.true_key).unwrap(), plain);
    }

    #[test]
    fn test_diagnostic_can_be_disabled() {
        let params = EvaluationParams {
            include_true_key_diagnostic: false,
            ..small_params()
        };
        let mut ev = Evaluator::new(Alphabet::latin(), params, Some(3)).unwrap();
        let report = ev
            .evaluate("attackatdawnattackatdawn", &UnigramFitness::english())
            .unwrap();
        assert_eq!(report.global.true_vs_rest_auc, None);
        assert!(report.local.values().all(|m| m.true_vs_rest_auc.is_none()));
    }

    #[test]
    fn test_invalid_params_rejected_at_construction() {
        let params = EvaluationParams {
            bootstrap_alpha: 0.0,
            ..EvaluationParams::default()
        };
        assert!(matches!(
            Evaluator::new(Alphabet::latin(), params, None),
            Err(EvalError::Config(_))
        ));
    }
}
