use std::collections::HashSet;

use crate::tokenize::normalize;

/// Candidates below this score are dropped from fallback results.
const SCORE_FLOOR: f64 = 0.15;

/// Score added when the candidate contains the query as an exact phrase.
const PHRASE_BONUS: f64 = 0.5;

/// Weight applied to the Jaccard word-overlap component.
const JACCARD_WEIGHT: f64 = 0.4;

/// Cumulative cap on the importance-keyword component.
const IMPORTANCE_CAP: f64 = 0.3;

/// Score added per matched semantic-association pair.
const ASSOCIATION_BONUS: f64 = 0.1;

/// Support-domain terms that matter more than their raw overlap suggests.
/// Each matched table word contributes `(weight - 1) * 0.1`, capped.
const IMPORTANCE_KEYWORDS: &[(&str, f64)] = &[
    ("password", 2.0),
    ("billing", 2.0),
    ("account", 1.8),
    ("login", 1.8),
    ("payment", 1.8),
    ("refund", 1.7),
    ("error", 1.7),
    ("bug", 1.6),
    ("cancel", 1.5),
    ("subscription", 1.5),
    ("problem", 1.4),
    ("issue", 1.4),
    ("help", 1.3),
    ("support", 1.3),
];

/// Word pairs that tend to co-occur in the same support topic. A pair
/// matches when one member appears in the query and the other in the
/// candidate.
const ASSOCIATION_PAIRS: &[(&str, &str)] = &[
    ("password", "reset"),
    ("login", "authentication"),
    ("billing", "payment"),
    ("error", "bug"),
    ("cancel", "subscription"),
    ("refund", "money"),
    ("upgrade", "plan"),
    ("email", "inbox"),
];

/// A keyword-fallback hit: candidate position and its score.
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub position: usize,
    pub score: f64,
}

/// Cheap heuristic similarity between a query and a candidate text.
///
/// Additive composition, clamped to 1.0: exact-phrase containment, weighted
/// Jaccard word overlap, an importance-keyword bonus, and semantic
/// association pairs. Used only when the vector searcher is unready or
/// returned nothing.
pub fn calculate_similarity(query: &str, candidate: &str) -> f64 {
    let query_norm = normalize(query);
    let candidate_norm = normalize(candidate);
    if query_norm.is_empty() || candidate_norm.is_empty() {
        return 0.0;
    }

    let query_words: HashSet<&str> = query_norm.split(' ').collect();
    let candidate_words: HashSet<&str> = candidate_norm.split(' ').collect();

    let mut score = 0.0;

    if candidate_norm.contains(&query_norm) {
        score += PHRASE_BONUS;
    }

    let intersection = query_words.intersection(&candidate_words).count();
    let union = query_words.union(&candidate_words).count();
    if union > 0 {
        score += JACCARD_WEIGHT * intersection as f64 / union as f64;
    }

    let mut importance = 0.0;
    for (keyword, weight) in IMPORTANCE_KEYWORDS {
        if query_words.contains(keyword) && candidate_words.contains(keyword) {
            importance += (weight - 1.0) * 0.1;
        }
    }
    score += importance.min(IMPORTANCE_CAP);

    for (a, b) in ASSOCIATION_PAIRS {
        let forward = query_words.contains(a) && candidate_words.contains(b);
        let backward = query_words.contains(b) && candidate_words.contains(a);
        if forward || backward {
            score += ASSOCIATION_BONUS;
        }
    }

    score.min(1.0)
}

/// Score every candidate against the query and return the best `top_k`.
///
/// Candidates scoring at or below the floor are dropped; ties keep the
/// candidates' original order.
pub fn rank<'a, I>(query: &str, candidates: I, top_k: usize) -> Vec<KeywordMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matches: Vec<KeywordMatch> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(position, text)| {
            let score = calculate_similarity(query, text);
            (score > SCORE_FLOOR).then_some(KeywordMatch { position, score })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}
