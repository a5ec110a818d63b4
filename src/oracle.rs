/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rolling rows instead of the full (m+1)x(n+1) table.
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Oracle distance in `[0, 1]`: edit distance scaled by the longer length.
/// Lower is closer to the gold plaintext; `0.0` iff the strings are equal.
pub fn normalised_levenshtein(candidate: &str, gold: &str) -> f64 {
    let longest = candidate
        .chars()
        .count()
        .max(gold.chars().count())
        .max(1);
    levenshtein(candidate, gold) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_normalised_bounds() {
        assert_eq!(normalised_levenshtein("", ""), 0.0);
        assert_eq!(normalised_levenshtein("same", "same"), 0.0);
        assert_eq!(normalised_levenshtein("abcd", "wxyz"), 1.0);
        let d = normalised_levenshtein("hello", "hallo");
        assert!((d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // Two-byte symbols must still count as a single edit.
        assert_eq!(levenshtein("αβγ", "αβδ"), 1);
        assert!((normalised_levenshtein("αβγ", "αβδ") - 1.0 / 3.0).abs() < 1e-12);
    }
}
