use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use typed_builder::TypedBuilder;

pub const DEFAULT_SEED: u64 = 12345;

/// Sizes and switches for a single-plaintext evaluation. All counts are upper
/// bounds.
#[derive(TypedBuilder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationParams {
    /// Random keys in the global pool.
    #[builder(default = 500)]
    pub global_num_keys: usize,
    #[builder(default = 50_000)]
    pub global_max_pairs: usize,

    /// One local pool per radius, evaluated in the given order.
    #[builder(default = vec![1, 2, 3])]
    pub local_radii: Vec<usize>,
    /// Seeds per local pool, the true key included.
    #[builder(default = 3)]
    pub local_seeds: usize,
    /// Neighbours sampled per seed and per distance `1..=radius`.
    #[builder(default = 200)]
    pub local_per_seed: usize,
    #[builder(default = 50_000)]
    pub local_max_pairs: usize,

    #[builder(default = true)]
    pub include_true_key_diagnostic: bool,

    /// Zero disables the bootstrap interval in reports.
    #[builder(default = 0)]
    pub bootstrap_iterations: usize,
    #[builder(default = 0.05)]
    pub bootstrap_alpha: f64,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EvaluationParams {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> EvalResult<Self> {
        let content = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> EvalResult<()> {
        if !(self.bootstrap_alpha > 0.0 && self.bootstrap_alpha < 1.0) {
            return Err(EvalError::Config(format!(
                "bootstrap_alpha must lie in (0, 1), got {}",
                self.bootstrap_alpha
            )));
        }
        if self.local_radii.contains(&0) {
            return Err(EvalError::Config("local radii must be >= 1".into()));
        }
        Ok(())
    }
}

/// Prefix selection for batch evaluation.
#[derive(TypedBuilder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParams {
    /// Plaintexts to evaluate; the source must supply this many.
    #[builder(default = 30)]
    pub max_texts: usize,
    /// Minimum plaintext length in symbols.
    #[builder(default = 150)]
    pub min_len: usize,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self::builder().build()
    }
}
