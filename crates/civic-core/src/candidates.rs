use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use uuid::Uuid;

use civic_types::{Report, ReportStatus};

use crate::error::Result;
use crate::store::{ReportFilter, ReportStore};

/// Statuses a report can be in and still be duplicated.
pub const LIVE_STATUSES: [ReportStatus; 2] = [ReportStatus::Open, ReportStatus::InProgress];

/// Start of the recency window ending at `now`.
pub fn window_start(now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Live, non-deleted reports in `city_id` created at or after `since`,
/// newest first and capped at `limit`. No candidates is an empty list.
pub fn fetch_candidates<S: ReportStore>(
    store: &S,
    city_id: Uuid,
    category: Option<&str>,
    since: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Report>> {
    let filter = ReportFilter {
        city_id,
        category: category.map(str::to_string),
        statuses: LIVE_STATUSES.to_vec(),
        created_since: Some(since),
        include_deleted: false,
        limit: Some(limit),
    };

    let mut reports = store.find_reports(&filter)?;

    // Scoring only ever sees live reports of this city, whatever the store returns.
    reports.retain(|r| {
        r.city_id == city_id
            && !r.deleted
            && r.status.is_live()
            && r.created_at >= since
            && category.is_none_or(|c| r.category.eq_ignore_ascii_case(c))
    });
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    reports.truncate(limit as usize);

    debug!(
        "Fetched {} duplicate candidates for city {} since {}",
        reports.len(),
        city_id,
        since
    );
    Ok(reports)
}
