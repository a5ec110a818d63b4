use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid Alphabet: {0}")]
    InvalidAlphabet(String),

    #[error("Invalid Key: {0}")]
    InvalidKey(String),

    #[error("Insufficient Data: found {found} of {requested} plaintexts with length >= {min_len}")]
    InsufficientData {
        found: usize,
        requested: usize,
        min_len: usize,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;
