//! Duplicate detection for draft reports.
//!
//! Each live candidate in the draft's city is scored as
//!
//! ```text
//! score = TEXT_WEIGHT * similarity
//!       + PROXIMITY_BONUS   (candidate within the configured radius)
//!       + CATEGORY_BONUS    (same category)
//! ```
//!
//! For drafts without coordinates the proximity term is dropped, the score is
//! rescaled to the remaining weights, and the text similarity must also clear
//! [`NO_LOCATION_MIN_SIMILARITY`].

use std::cmp::Ordering;

use tracing::debug;

use civic_types::{DraftReport, DuplicateMatch, Report};

use crate::candidates::{fetch_candidates, window_start};
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::geo;
use crate::similarity::report_similarity;
use crate::store::ReportStore;

pub const TEXT_WEIGHT: f64 = 0.7;
pub const PROXIMITY_BONUS: f64 = 0.2;
pub const CATEGORY_BONUS: f64 = 0.1;

/// Text similarity floor for drafts that carry no location.
pub const NO_LOCATION_MIN_SIMILARITY: f64 = 0.75;

pub const EXCERPT_CHARS: usize = 140;

/// Rejects drafts that cannot be scored. Runs before any I/O.
pub fn validate_draft(draft: &DraftReport) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(CoreError::validation("draft title is required"));
    }
    if draft.category.trim().is_empty() {
        return Err(CoreError::validation("draft category is required"));
    }
    if let Some(coords) = draft.coordinates {
        if !coords.is_valid() {
            return Err(CoreError::validation(format!(
                "coordinates out of range: ({}, {})",
                coords.lat, coords.lon
            )));
        }
    }
    Ok(())
}

/// Full duplicate check: retrieve candidates, score, rank.
pub fn detect_duplicates<S: ReportStore>(
    store: &S,
    config: &CoreConfig,
    draft: &DraftReport,
) -> Result<Vec<DuplicateMatch>> {
    validate_draft(draft)?;

    let since = window_start(draft.submitted_at, config.recency_window);
    let category = config.restrict_to_category.then_some(draft.category.as_str());
    let candidates = fetch_candidates(store, draft.city_id, category, since, config.max_candidates)?;

    let matches = rank_candidates(draft, &candidates, config);
    debug!(
        "Duplicate check in city {}: {} candidates, {} matches",
        draft.city_id,
        candidates.len(),
        matches.len()
    );
    Ok(matches)
}

/// Scores, filters and orders `candidates`. Deterministic for a fixed input:
/// score descending, then closer, then newer, then by id.
pub fn rank_candidates(
    draft: &DraftReport,
    candidates: &[Report],
    config: &CoreConfig,
) -> Vec<DuplicateMatch> {
    let mut matches: Vec<DuplicateMatch> = candidates
        .iter()
        .filter_map(|candidate| score_candidate(draft, candidate, config))
        .collect();

    matches.sort_by(compare_matches);
    matches.truncate(config.max_matches);
    matches
}

/// `None` when the candidate falls below the threshold.
pub fn score_candidate(
    draft: &DraftReport,
    candidate: &Report,
    config: &CoreConfig,
) -> Option<DuplicateMatch> {
    let similarity = report_similarity(
        &draft.title,
        &draft.description,
        &candidate.title,
        &candidate.description,
    );
    let category_bonus = if draft.category.trim().eq_ignore_ascii_case(candidate.category.trim()) {
        CATEGORY_BONUS
    } else {
        0.0
    };

    let (score, distance_meters) = match draft.coordinates {
        Some(_) => {
            let distance = geo::distance_between(draft.coordinates, candidate.coordinates);
            let proximity = match distance {
                Some(d) if d <= config.radius_meters => PROXIMITY_BONUS,
                _ => 0.0,
            };
            (TEXT_WEIGHT * similarity + proximity + category_bonus, distance)
        }
        None => {
            if similarity < NO_LOCATION_MIN_SIMILARITY {
                return None;
            }
            let score = (TEXT_WEIGHT * similarity + category_bonus) / (TEXT_WEIGHT + CATEGORY_BONUS);
            (score, None)
        }
    };

    let score = score.clamp(0.0, 1.0);
    if score < config.threshold {
        return None;
    }

    Some(DuplicateMatch {
        report_id: candidate.id,
        title: candidate.title.clone(),
        status: candidate.status,
        created_at: candidate.created_at,
        similarity,
        score,
        distance_meters,
        excerpt: excerpt(&candidate.description, EXCERPT_CHARS),
        priority_count: candidate.priority_count,
    })
}

fn compare_matches(a: &DuplicateMatch, b: &DuplicateMatch) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.distance_meters, b.distance_meters) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.report_id.cmp(&b.report_id))
}

/// First `max_chars` characters of `text` with whitespace collapsed,
/// ending in "..." when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
