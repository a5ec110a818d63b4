pub mod alphabet;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fitness;
pub mod keyspace;
pub mod metrics;
pub mod oracle;
pub mod pairwise;
pub mod pool;
pub mod reports;

pub use alphabet::{Alphabet, KnownAlphabet};
pub use config::{BatchParams, EvaluationParams, DEFAULT_SEED};
pub use error::{EvalError, EvalResult};
pub use evaluator::{BatchReport, EvaluationReport, Evaluator, RocPanel};
pub use fitness::{Fitness, UnigramFitness};
pub use keyspace::{Key, PermutationKeyspace};
