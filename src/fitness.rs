use crate::error::{EvalError, EvalResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// A scoring heuristic under evaluation. Higher means "more plaintext-like".
///
/// Must be referentially stable (same input, same output) for reports to be
/// reproducible under a fixed seed. Any `Fn(&str) -> f64` qualifies.
pub trait Fitness {
    fn score(&self, text: &str) -> f64;
}

impl<F> Fitness for F
where
    F: Fn(&str) -> f64,
{
    #[inline(always)]
    fn score(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Log-probability of a symbol missing from the table.
pub const DEFAULT_UNKNOWN_LOG_PROB: f64 = -10.0;

const ENGLISH_LOG_PROBS: [(char, f64); 26] = [
    ('a', -2.4966452483625),
    ('b', -4.2354233094168),
    ('c', -3.3486757306932),
    ('d', -3.3128001327250),
    ('e', -2.1169743058026),
    ('f', -3.8213517734372),
    ('g', -3.8547433177710),
    ('h', -3.1595087861602),
    ('i', -2.5737619670459),
    ('j', -6.4227092328015),
    ('k', -4.9393292753621),
    ('l', -3.1604294954037),
    ('m', -3.6835202980909),
    ('n', -2.6297692035200),
    ('o', -2.5676852552873),
    ('p', -3.7746674480023),
    ('q', -6.7270353094652),
    ('r', -2.7442558598409),
    ('s', -2.6958171182545),
    ('t', -2.4177946239161),
    ('u', -3.5206505642792),
    ('v', -4.4720428823618),
    ('w', -4.1357029373497),
    ('x', -6.0327463593828),
    ('y', -3.9765738593564),
    ('z', -6.7842837617938),
];

/// Unigram log-likelihood: `sum_i log p(text[i])`.
#[derive(Debug, Clone)]
pub struct UnigramFitness {
    log_probs: HashMap<char, f64>,
    unknown: f64,
}

impl UnigramFitness {
    pub fn new(log_probs: HashMap<char, f64>, unknown: f64) -> Self {
        Self { log_probs, unknown }
    }

    /// English letter frequencies over a..z.
    pub fn english() -> Self {
        Self::new(
            ENGLISH_LOG_PROBS.iter().copied().collect(),
            DEFAULT_UNKNOWN_LOG_PROB,
        )
    }

    pub fn with_unknown(mut self, unknown: f64) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn log_prob(&self, symbol: char) -> f64 {
        self.log_probs.get(&symbol).copied().unwrap_or(self.unknown)
    }

    pub fn len(&self) -> usize {
        self.log_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_probs.is_empty()
    }

    /// Reads a `symbol,log_prob` table (header row required).
    pub fn from_log_prob_csv<P: AsRef<Path>>(path: P) -> EvalResult<Self> {
        let path = path.as_ref();
        info!("📚 Loading unigram log-probabilities: {:?}", path);
        let rows = read_symbol_table(File::open(path)?)?.rows;
        if rows.is_empty() {
            return Err(EvalError::Config(format!(
                "no usable rows in log-probability table {:?}",
                path
            )));
        }
        Ok(Self::new(rows.into_iter().collect(), DEFAULT_UNKNOWN_LOG_PROB))
    }

    /// Reads a `symbol,count` table and converts counts to log-probabilities
    /// (`ln count - ln total`). Zero counts are skipped.
    pub fn from_counts_csv<P: AsRef<Path>>(path: P) -> EvalResult<Self> {
        let path = path.as_ref();
        info!("📚 Loading unigram counts: {:?}", path);
        Self::from_counts_reader(File::open(path)?)
    }

    pub fn from_counts_reader<R: Read>(reader: R) -> EvalResult<Self> {
        let rows = read_symbol_table(reader)?.rows;

        let mut counts = Vec::with_capacity(rows.len());
        for (symbol, count) in rows {
            if count > 0.0 {
                counts.push((symbol, count));
            } else {
                warn!("Skipping symbol '{}' with non-positive count {}", symbol, count);
            }
        }

        let total: f64 = counts.iter().map(|(_, c)| c).sum();
        if total <= 0.0 {
            return Err(EvalError::Config("unigram counts sum to zero".into()));
        }

        let log_total = total.ln();
        let log_probs: HashMap<char, f64> = counts
            .into_iter()
            .map(|(symbol, count)| (symbol, count.ln() - log_total))
            .collect();
        debug!("Converted {} unigram counts (total {})", log_probs.len(), total);

        Ok(Self::new(log_probs, DEFAULT_UNKNOWN_LOG_PROB))
    }
}

impl Default for UnigramFitness {
    fn default() -> Self {
        Self::english()
    }
}

impl Fitness for UnigramFitness {
    fn score(&self, text: &str) -> f64 {
        text.chars().map(|c| self.log_prob(c)).sum()
    }
}

/// Rows read from a symbol table, plus how many multi-symbol tokens were
/// left out.
#[derive(Debug, Default)]
struct SymbolTable {
    rows: Vec<(char, f64)>,
    ngram_rows: usize,
}

/// First column is a single symbol, last column a number. Malformed rows are
/// skipped. Multi-symbol tokens are counted, and a table dominated by them
/// (an n-gram table loaded as unigrams) is reported at `warn!`.
fn read_symbol_table<R: Read>(reader: R) -> EvalResult<SymbolTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut table = SymbolTable::default();
    for record in rdr.records() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }

        let mut chars = record[0].trim().chars();
        let symbol = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            (Some(_), Some(_)) => {
                table.ngram_rows += 1;
                continue;
            }
            _ => continue,
        };

        match record[record.len() - 1].trim().parse::<f64>() {
            Ok(v) if v.is_finite() => table.rows.push((symbol, v)),
            _ => debug!("Skipping unparsable value for '{}'", symbol),
        }
    }

    if table.ngram_rows > table.rows.len() {
        warn!(
            "⚠️  {} multi-symbol rows ignored against {} unigram rows; is this an n-gram table?",
            table.ngram_rows,
            table.rows.len()
        );
    } else if table.ngram_rows > 0 {
        debug!("Ignored {} multi-symbol rows", table.ngram_rows);
    }
    Ok(table)
}
