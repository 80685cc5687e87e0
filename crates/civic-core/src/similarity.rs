//! Text similarity for report deduplication.
//!
//! Scores are blends of two signals over normalized word tokens:
//! token-set overlap (Jaccard) and a normalized Levenshtein ratio over the
//! sorted token set, which tolerates reordering ("broken street light" vs
//! "street light broken") and small typos. All functions are symmetric and
//! return values in `0.0..=1.0`.

use std::collections::BTreeSet;

/// Share of the token-overlap signal in [`similarity`]; the edit signal gets the rest.
pub const TOKEN_WEIGHT: f64 = 0.7;
pub const EDIT_WEIGHT: f64 = 1.0 - TOKEN_WEIGHT;

/// Share of the title-only signal in [`report_similarity`]; the combined
/// title and description text gets the rest.
pub const TITLE_WEIGHT: f64 = 0.4;
pub const BODY_WEIGHT: f64 = 1.0 - TITLE_WEIGHT;

/// Containment (one title's words all inside the other) counts for less than
/// a true match.
pub const CONTAINMENT_DISCOUNT: f64 = 0.85;

/// Similarity of two free texts. Empty input on either side scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let overlap = jaccard(&tokens_a, &tokens_b);
    let edit = strsim::normalized_levenshtein(&join(&tokens_a), &join(&tokens_b));

    (TOKEN_WEIGHT * overlap + EDIT_WEIGHT * edit).clamp(0.0, 1.0)
}

/// Title-focused similarity: short titles often differ only by extra words,
/// so full containment of the shorter title is also accepted, discounted.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let base = similarity(a, b);
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    let contained = containment(&tokens_a, &tokens_b) * CONTAINMENT_DISCOUNT;
    base.max(contained).clamp(0.0, 1.0)
}

/// Similarity of two reports given as (title, description) pairs.
pub fn report_similarity(title_a: &str, body_a: &str, title_b: &str, body_b: &str) -> f64 {
    let full_a = full_text(title_a, body_a);
    let full_b = full_text(title_b, body_b);
    let body = similarity(&full_a, &full_b);
    let title = title_similarity(title_a, title_b);
    (BODY_WEIGHT * body + TITLE_WEIGHT * title).clamp(0.0, 1.0)
}

/// Lowercased alphanumeric word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

fn full_text(title: &str, body: &str) -> String {
    match (title.trim(), body.trim()) {
        ("", body) => body.to_string(),
        (title, "") => title.to_string(),
        (title, body) => format!("{} {}", title, body),
    }
}

fn join(tokens: &BTreeSet<String>) -> String {
    tokens.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Fraction of the smaller set found in the larger one.
fn containment(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}
