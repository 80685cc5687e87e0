use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};
use uuid::Uuid;

use civic_types::{DraftReport, DuplicateMatch, PriorityToggle, SeverityAggregate, Voter};

use crate::config::CoreConfig;
use crate::duplicates;
use crate::error::{CoreError, Result};
use crate::priority;
use crate::severity;
use crate::store::ReportStore;

/// Caller-facing operations. Every store round trip runs on the blocking
/// pool.
pub struct CivicCore<S: ReportStore> {
    store: Arc<S>,
    config: Arc<CoreConfig>,
}

impl<S: ReportStore> Clone for CivicCore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: ReportStore> CivicCore<S> {
    pub fn new(store: Arc<S>, config: CoreConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Duplicate check bounded by the configured timeout.
    pub async fn check_duplicate(&self, draft: DraftReport) -> Result<Vec<DuplicateMatch>> {
        self.check_duplicate_within(draft, self.config.check_timeout).await
    }

    /// Duplicate check bounded by `timeout`. On expiry the whole result is
    /// discarded and `CoreError::Timeout` returned.
    pub async fn check_duplicate_within(
        &self,
        draft: DraftReport,
        timeout: Duration,
    ) -> Result<Vec<DuplicateMatch>> {
        duplicates::validate_draft(&draft)?;

        let store = self.store.clone();
        let config = self.config.clone();
        let city_id = draft.city_id;
        let task = tokio::task::spawn_blocking(move || {
            duplicates::detect_duplicates(store.as_ref(), &config, &draft)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                CoreError::from(e)
            })?,
            Err(_) => {
                warn!("Duplicate check for city {} exceeded {:?}", city_id, timeout);
                Err(CoreError::Timeout(timeout))
            }
        }
    }

    pub async fn toggle_vote(&self, voter: Voter, report_id: Uuid) -> Result<PriorityToggle> {
        priority::ensure_may_vote(&voter)?;
        self.blocking(move |store| priority::toggle_vote(store, &voter, report_id))
            .await
    }

    pub async fn has_priority_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.blocking(move |store| priority::has_priority_vote(store, report_id, user_id))
            .await
    }

    pub async fn record_severity(
        &self,
        voter: Voter,
        report_id: Uuid,
        severity: i64,
    ) -> Result<SeverityAggregate> {
        severity::validate_severity(severity)?;
        priority::ensure_may_vote(&voter)?;
        let now = chrono::Utc::now();
        self.blocking(move |store| severity::record_severity(store, &voter, report_id, severity, now))
            .await
    }

    pub async fn get_severity_aggregate(&self, report_id: Uuid) -> Result<SeverityAggregate> {
        self.blocking(move |store| severity::get_aggregate(store, report_id))
            .await
    }

    pub async fn user_severity(&self, report_id: Uuid, user_id: Uuid) -> Result<Option<u8>> {
        self.blocking(move |store| severity::user_severity(store, report_id, user_id))
            .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&S) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                CoreError::from(e)
            })?
    }
}
