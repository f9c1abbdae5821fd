//! Title similarity: character-run ratio blended with keyword overlap.
//!
//! `similarity = text_weight * text_sim + keyword_weight * keyword_sim`
//!
//! - `text_sim`    : gestalt (Ratcliff/Obershelp) ratio over the normalized strings,
//!   `2 * matched_chars / (len_a + len_b)` where matches are found by recursively taking
//!   the longest common contiguous run.
//! - `keyword_sim` : Jaccard over keyword sets (stop words and short tokens removed),
//!   0 when either set is empty.
//!
//! Pure and deterministic: no locale-dependent folding, no hashing-order effects.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use serde::Deserialize;

/// Blend weights and keyword filtering knobs.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    pub text_weight: f64,
    pub keyword_weight: f64,
    /// Tokens shorter than this (in chars) are not keywords.
    pub min_keyword_len: usize,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            keyword_weight: 0.4,
            min_keyword_len: 3,
        }
    }
}

/// Spanish + English function words.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // es
        "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "del", "al", "en", "y",
        "o", "que", "por", "para", "con", "sin", "sobre", "entre", "se", "su", "sus", "es",
        "son", "fue", "ha", "han", "como", "mas", "más", "pero", "lo", "le", "les", "este",
        "esta", "estos", "estas", "ese", "esa", "tras", "ante", "desde", "hasta", "según",
        "segun", "muy", "ya", "no", "si", "sí", "cuando", "donde", "porque", "también",
        "tambien", "otro", "otra", "hay", "ser", "está", "están", "estan",
        // en
        "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "at", "by", "for",
        "with", "from", "as", "is", "are", "was", "were", "be", "been", "has", "have", "had",
        "it", "its", "this", "that", "these", "those", "after", "before", "over", "into",
        "about", "than", "then", "not", "no", "will", "would", "can", "could", "says",
        "said", "new", "more", "amid", "who", "what", "how", "why",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keyword set of an already-normalized string.
pub fn keywords(normalized: &str, min_len: usize) -> BTreeSet<String> {
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() >= min_len && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Jaccard index; 0 when either side is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / union
}

/// Gestalt ratio in [0,1]; two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run in `a[alo..ahi]` x `b[blo..bhi]`; earliest in `a` wins ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best_k {
                best_k = curr[col];
                best_i = i + 1 - best_k;
                best_j = j + 1 - best_k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_k)
}

/// Combined similarity with default params.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_with(a, b, &SimilarityParams::default())
}

/// Combined similarity in [0,1]. Identical non-empty inputs score exactly 1.
pub fn similarity_with(a: &str, b: &str, params: &SimilarityParams) -> f64 {
    if !a.is_empty() && a == b {
        return 1.0;
    }
    let na = normalize(a);
    let nb = normalize(b);
    if !na.is_empty() && na == nb {
        return 1.0;
    }

    let text_sim = sequence_ratio(&na, &nb);
    let keyword_sim = jaccard(
        &keywords(&na, params.min_keyword_len),
        &keywords(&nb, params.min_keyword_len),
    );

    let weights = params.text_weight + params.keyword_weight;
    if weights <= 0.0 {
        return 0.0;
    }
    let raw = params.text_weight * text_sim + params.keyword_weight * keyword_sim;
    // Weight sums above 1 are scaled back into [0,1].
    (raw / weights.max(1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn default_weights_are_pinned() {
        let p = SimilarityParams::default();
        assert!(approx(p.text_weight, 0.6));
        assert!(approx(p.keyword_weight, 0.4));
        assert_eq!(p.min_keyword_len, 3);
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Sismo, en CHILE!!  "), "sismo en chile");
        assert_eq!(normalize("¿Qué pasó?"), "qué pasó");
    }

    #[test]
    fn keywords_drop_stop_words_and_short_tokens() {
        let k = keywords("el gobierno de chile y the senate ok", 3);
        let got: Vec<&str> = k.iter().map(String::as_str).collect();
        assert_eq!(got, vec!["chile", "gobierno", "senate"]);
    }

    #[test]
    fn sequence_ratio_matches_known_values() {
        // "abcd" vs "bcde": longest run "bcd" (3) -> 2*3/8
        assert!(approx(sequence_ratio("abcd", "bcde"), 0.75));
        assert!(approx(sequence_ratio("", ""), 1.0));
        assert!(approx(sequence_ratio("abc", ""), 0.0));
        assert!(approx(sequence_ratio("abc", "xyz"), 0.0));
    }

    #[test]
    fn combined_score_uses_pinned_blend() {
        // Two shared keywords out of four.
        let a = "Storm floods Valencia";
        let b = "Storm floods Madrid";
        let na = normalize(a);
        let nb = normalize(b);
        let text = sequence_ratio(&na, &nb);
        let kw = jaccard(&keywords(&na, 3), &keywords(&nb, 3));
        assert!(approx(kw, 2.0 / 4.0));
        assert!(approx(similarity(a, b), 0.6 * text + 0.4 * kw));
    }

    #[test]
    fn identical_text_is_one_even_without_keywords() {
        assert!(approx(similarity("el de la", "el de la"), 1.0));
        assert!(approx(similarity("Hello, World", "hello world"), 1.0));
    }

    #[test]
    fn unrelated_titles_score_low() {
        let s = similarity(
            "Central bank raises interest rates",
            "Football club wins league title",
        );
        assert!(s < 0.4, "got {s}");
    }
}
