use chrono::{DateTime, Utc};
use uuid::Uuid;

use civic_types::{Report, ReportStatus, SeverityVote};

use crate::error::StoreError;

/// Selection criteria for `ReportStore::find_reports`.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub city_id: Uuid,
    /// Exact category match, case-insensitive.
    pub category: Option<String>,
    /// Empty means any status.
    pub statuses: Vec<ReportStatus>,
    /// Inclusive lower bound on `created_at`.
    pub created_since: Option<DateTime<Utc>>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
}

impl ReportFilter {
    pub fn city(city_id: Uuid) -> Self {
        Self {
            city_id,
            category: None,
            statuses: Vec::new(),
            created_since: None,
            include_deleted: false,
            limit: None,
        }
    }
}

/// Mutations available inside a single store transaction. Everything done
/// through one `VoteTransaction` commits together or not at all.
pub trait VoteTransaction {
    fn report(&mut self, report_id: Uuid) -> Result<Option<Report>, StoreError>;

    /// Returns `true` if a row was removed.
    fn delete_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Fails with `StoreError::UniqueViolation` if the pair already voted.
    fn create_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    /// Adds `delta` to the report's counter and returns the new raw value,
    /// which may be negative if the counter had drifted.
    fn update_report_counter(&mut self, report_id: Uuid, delta: i64) -> Result<i64, StoreError>;

    fn set_report_counter(&mut self, report_id: Uuid, value: i64) -> Result<(), StoreError>;

    /// Inserts or overwrites the (report, user) severity row.
    fn upsert_severity_vote(
        &mut self,
        report_id: Uuid,
        user_id: Uuid,
        severity: u8,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// The persistence collaborator. Implementations must be safe to call from
/// blocking worker threads concurrently.
pub trait ReportStore: Send + Sync + 'static {
    /// Matching reports, newest first.
    fn find_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError>;

    fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, StoreError>;

    fn has_priority_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    fn severity_votes(&self, report_id: Uuid) -> Result<Vec<SeverityVote>, StoreError>;

    fn severity_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<Option<SeverityVote>, StoreError>;

    /// Runs `f` in one transaction, committing on `Ok` and rolling back on `Err`.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn VoteTransaction) -> Result<T, E>,
        E: From<StoreError>;
}
