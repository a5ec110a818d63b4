use crate::alphabet::Alphabet;
use crate::error::{EvalError, EvalResult};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A monoalphabetic substitution key.
///
/// Position `i` holds the ciphertext symbol for plaintext alphabet index `i`,
/// so the identity key spells out the alphabet itself. Keys built through
/// [`Key::from`] are unchecked; the keyspace validates them on use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(Vec<char>);

impl Key {
    /// Builds a key and checks that it permutes `alphabet`.
    pub fn parse(alphabet: &Alphabet, text: &str) -> EvalResult<Self> {
        let key = Key::from(text);
        check_permutation(alphabet, &key)?;
        Ok(key)
    }

    pub fn symbols(&self) -> &[char] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(value.chars().collect())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::from(value.as_str())
    }
}

impl From<Key> for String {
    fn from(value: Key) -> Self {
        value.0.into_iter().collect()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

fn check_permutation(alphabet: &Alphabet, key: &Key) -> EvalResult<()> {
    let a = alphabet.len();
    if key.len() != a {
        return Err(EvalError::InvalidKey(format!(
            "key '{}' has length {}, alphabet has {}",
            key,
            key.len(),
            a
        )));
    }

    let mut seen = vec![false; a];
    for &c in key.symbols() {
        match alphabet.index_of(c) {
            Some(idx) if !seen[idx] => seen[idx] = true,
            Some(_) => {
                return Err(EvalError::InvalidKey(format!(
                    "key '{}' repeats symbol '{}'",
                    key, c
                )))
            }
            None => {
                return Err(EvalError::InvalidKey(format!(
                    "key '{}' contains '{}' outside the alphabet",
                    key, c
                )))
            }
        }
    }
    Ok(())
}

/// The keyspace of substitution keys over a fixed alphabet.
///
/// Holds no generator of its own: every sampling call borrows the caller's
/// `Rng`, which keeps runs reproducible under a fixed seed.
#[derive(Debug, Clone)]
pub struct PermutationKeyspace {
    alphabet: Alphabet,
}

impl PermutationKeyspace {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Alphabet size `A`.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.alphabet.len()
    }

    pub fn identity_key(&self) -> Key {
        Key(self.alphabet.symbols().to_vec())
    }

    pub fn random_key(&self, rng: &mut Rng) -> Key {
        let mut symbols = self.alphabet.symbols().to_vec();
        rng.shuffle(&mut symbols);
        Key(symbols)
    }

    pub fn validate_key(&self, key: &Key) -> EvalResult<()> {
        check_permutation(&self.alphabet, key)
    }

    /// Minimum number of transpositions turning `a` into `b` (Cayley distance).
    ///
    /// Equals `A - cycles(π)` where `π(i)` is the position in `b` of the
    /// symbol at index `i` of `a`.
    pub fn swap_distance(&self, a: &Key, b: &Key) -> EvalResult<usize> {
        self.validate_key(a)?;
        self.validate_key(b)?;

        let pos_b: HashMap<char, usize> = b
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i))
            .collect();
        let perm: Vec<usize> = a.symbols().iter().map(|c| pos_b[c]).collect();

        let n = perm.len();
        let mut visited = vec![false; n];
        let mut cycles = 0;
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut j = start;
            while !visited[j] {
                visited[j] = true;
                j = perm[j];
            }
            cycles += 1;
        }

        Ok(n - cycles)
    }

    /// Applies `radius` random transpositions to a copy of `key`.
    ///
    /// Approximate sampler: each swap picks a uniformly random pair of distinct
    /// positions, but later swaps may undo earlier ones, so the result lies at
    /// swap distance `<= radius` (with the same parity), not necessarily at
    /// exactly `radius`.
    pub fn neighbour_by_swaps(&self, key: &Key, radius: usize, rng: &mut Rng) -> Key {
        let mut symbols = key.symbols().to_vec();
        let n = symbols.len();
        if n < 2 {
            return Key(symbols);
        }

        for _ in 0..radius {
            let i = rng.usize(0..n);
            let mut j = rng.usize(0..n - 1);
            if j >= i {
                j += 1;
            }
            symbols.swap(i, j);
        }
        Key(symbols)
    }

    pub fn encrypt(&self, plaintext: &str, key: &Key) -> EvalResult<String> {
        self.validate_key(key)?;
        let table: HashMap<char, char> = self
            .alphabet
            .symbols()
            .iter()
            .copied()
            .zip(key.symbols().iter().copied())
            .collect();
        Ok(substitute(plaintext, &table))
    }

    pub fn decrypt(&self, ciphertext: &str, key: &Key) -> EvalResult<String> {
        self.validate_key(key)?;
        let table: HashMap<char, char> = key
            .symbols()
            .iter()
            .copied()
            .zip(self.alphabet.symbols().iter().copied())
            .collect();
        Ok(substitute(ciphertext, &table))
    }
}

impl Default for PermutationKeyspace {
    fn default() -> Self {
        Self::new(Alphabet::latin())
    }
}

#[inline(always)]
fn substitute(text: &str, table: &HashMap<char, char>) -> String {
    text.chars()
        .map(|c| table.get(&c).copied().unwrap_or(c))
        .collect()
}
