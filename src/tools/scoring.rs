//! Fuzzy relevance scoring for tool search.
//!
//! Scores lie in `[0, 1]`. Per query word the best of these signals wins:
//!
//! | signal | score |
//! |---|---|
//! | name prefix | 0.9 |
//! | exact keyword | 0.85 |
//! | name substring | 0.8 |
//! | keyword substring | 0.7 |
//! | description whole word | 0.6 |
//! | description substring | 0.5 |
//!
//! When none apply, Levenshtein similarity against the name (×0.7) or any
//! keyword (×0.6) is used, ignoring similarities below 0.6.

use std::cmp::Ordering;

const NAME_PREFIX: f64 = 0.9;
const NAME_SUBSTRING: f64 = 0.8;
const KEYWORD_EXACT: f64 = 0.85;
const KEYWORD_SUBSTRING: f64 = 0.7;
const DESCRIPTION_WORD: f64 = 0.6;
const DESCRIPTION_SUBSTRING: f64 = 0.5;
const FUZZY_NAME_WEIGHT: f64 = 0.7;
const FUZZY_KEYWORD_WEIGHT: f64 = 0.6;
const FUZZY_MIN_SIMILARITY: f64 = 0.6;
const ALL_WORDS_MATCHED: f64 = 0.9;

/// Default number of search results when the caller gives none.
pub const DEFAULT_MAX_RESULTS: usize = 10;
/// Upper bound on search results per request.
pub const MAX_RESULTS_CAP: usize = 100;

/// The fields a candidate is scored on.
#[derive(Debug, Clone, Copy)]
pub struct ScoreCandidate<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub keywords: &'a [String],
}

/// Score `candidate` against `query`.
pub fn score(query: &str, candidate: &ScoreCandidate<'_>) -> f64 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 1.0;
    }

    let name = candidate.name.to_lowercase();
    if name == query {
        return 1.0;
    }

    let prepared = Prepared {
        name,
        description: candidate.description.to_lowercase(),
        keywords: candidate.keywords.iter().map(|k| k.to_lowercase()).collect(),
    };

    let words: Vec<&str> = query.split_whitespace().collect();
    if let [word] = words.as_slice() {
        return prepared.score_word(word);
    }

    let scores: Vec<f64> = words
        .iter()
        .map(|word| prepared.score_word(word))
        .filter(|score| *score > 0.0)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }

    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    let combined = if scores.len() == words.len() {
        average * ALL_WORDS_MATCHED
    } else {
        average * (scores.len() as f64 / words.len() as f64)
    };
    combined.clamp(0.0, 1.0)
}

struct Prepared {
    name: String,
    description: String,
    keywords: Vec<String>,
}

impl Prepared {
    fn score_word(&self, word: &str) -> f64 {
        if self.name == word {
            return 1.0;
        }

        let mut best: f64 = 0.0;
        if self.name.starts_with(word) {
            best = best.max(NAME_PREFIX);
        } else if self.name.contains(word) {
            best = best.max(NAME_SUBSTRING);
        }
        for keyword in &self.keywords {
            if keyword == word {
                best = best.max(KEYWORD_EXACT);
            } else if keyword.contains(word) {
                best = best.max(KEYWORD_SUBSTRING);
            }
        }
        if description_words(&self.description).any(|w| w == word) {
            best = best.max(DESCRIPTION_WORD);
        } else if self.description.contains(word) {
            best = best.max(DESCRIPTION_SUBSTRING);
        }
        if best > 0.0 {
            return best;
        }

        let mut fuzzy = weighted_similarity(word, &self.name, FUZZY_NAME_WEIGHT);
        for keyword in &self.keywords {
            fuzzy = fuzzy.max(weighted_similarity(word, keyword, FUZZY_KEYWORD_WEIGHT));
        }
        fuzzy
    }
}

fn description_words(description: &str) -> impl Iterator<Item = &str> {
    description
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .filter(|w| !w.is_empty())
}

fn weighted_similarity(word: &str, target: &str, weight: f64) -> f64 {
    let sim = similarity(word, target);
    if sim < FUZZY_MIN_SIMILARITY {
        0.0
    } else {
        sim * weight
    }
}

/// `1 - distance / max(len)` over code points; 1.0 for two empty strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Levenshtein edit distance over Unicode code points.
///
/// Two-row dynamic program, O(m·n) time and O(min(m, n)) space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Clamp a caller-supplied result cap into `[1, MAX_RESULTS_CAP]`.
///
/// Missing or non-positive values fall back to `default`.
pub fn clamp_max_results(requested: Option<i64>, default: usize) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(MAX_RESULTS_CAP).min(MAX_RESULTS_CAP),
        _ => default.clamp(1, MAX_RESULTS_CAP),
    }
}

/// Order by score descending, then name ascending.
pub fn rank_order(left: (f64, &str), right: (f64, &str)) -> Ordering {
    right
        .0
        .partial_cmp(&left.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| left.1.cmp(right.1))
}
