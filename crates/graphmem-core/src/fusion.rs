//! Ranking and score fusion.

use std::cmp::Ordering;
use std::collections::HashMap;

use graphmem_protocols::Embedding;

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;

/// Descending score, then ascending name.
fn by_score_then_name(a: &(String, f32), b: &(String, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Rank stored vectors by cosine similarity to `query`.
///
/// Scores are clamped to `[0, 1]`. Vectors of another dimension score 0.
pub(crate) fn rank_by_similarity(
    query: &Embedding,
    stored: Vec<(String, Vec<f32>)>,
    limit: usize,
) -> Vec<(String, f32)> {
    let mut ranked: Vec<(String, f32)> = stored
        .into_iter()
        .map(|(name, vector)| {
            let score = query.cosine_similarity_to(&vector).clamp(0.0, 1.0);
            (name, score)
        })
        .collect();
    ranked.sort_by(by_score_then_name);
    ranked.truncate(limit);
    ranked
}

/// Weighted linear combination of two normalised rankings.
///
/// Every name in either list is kept; a name missing from one list gets 0
/// from it.
pub(crate) fn weighted_fusion(
    semantic: &[(String, f32)],
    keyword: &[(String, f32)],
    semantic_weight: f32,
    keyword_weight: f32,
) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for (name, score) in semantic {
        *scores.entry(name.clone()).or_insert(0.0) += semantic_weight * score;
    }
    for (name, score) in keyword {
        *scores.entry(name.clone()).or_insert(0.0) += keyword_weight * score;
    }

    let mut results: Vec<(String, f32)> = scores.into_iter().collect();
    results.sort_by(by_score_then_name);
    results
}
