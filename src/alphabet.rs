use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Ordered set of unique symbols. Defines the key length and the
/// permutation domain of a keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> EvalResult<Self> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.is_empty() {
            return Err(EvalError::InvalidAlphabet("alphabet is empty".into()));
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (i, &c) in symbols.iter().enumerate() {
            if index.insert(c, i).is_some() {
                return Err(EvalError::InvalidAlphabet(format!(
                    "symbol '{}' appears more than once",
                    c
                )));
            }
        }

        Ok(Self { symbols, index })
    }

    /// Lowercase a..z.
    pub fn latin() -> Self {
        KnownAlphabet::Latin.alphabet()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    #[inline(always)]
    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    #[inline(always)]
    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    pub fn as_string(&self) -> String {
        self.symbols.iter().collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::latin()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl TryFrom<String> for Alphabet {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Alphabet::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(value: Alphabet) -> Self {
        value.as_string()
    }
}

/// Built-in lowercase alphabets, addressable by snake_case name.
#[derive(Debug, Clone, Copy, EnumIter, EnumString, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum KnownAlphabet {
    Latin,
    Greek,
    Cyrillic,
}

impl KnownAlphabet {
    pub fn get_str(&self) -> &'static str {
        match self {
            Self::Latin => "abcdefghijklmnopqrstuvwxyz",
            // No final sigma; callers fold ς into σ before evaluation.
            Self::Greek => "αβγδεζηθικλμνξοπρστυφχψω",
            Self::Cyrillic => "абвгдеёжзийклмнопрстуфхцчшщъыьэюя",
        }
    }

    pub fn alphabet(&self) -> Alphabet {
        // The catalogue strings are unique by construction.
        let symbols: Vec<char> = self.get_str().chars().collect();
        let index = symbols.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Alphabet { symbols, index }
    }
}
