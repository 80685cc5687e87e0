//! In-memory `ReportStore` for unit tests. Transactions run against a copy
//! of the state that is written back only on success.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use civic_types::{Report, ReportStatus, SeverityVote};

use crate::error::StoreError;
use crate::store::{ReportFilter, ReportStore, VoteTransaction};

#[derive(Clone, Default)]
struct State {
    reports: BTreeMap<Uuid, Report>,
    priority_votes: BTreeSet<(Uuid, Uuid)>,
    severity_votes: BTreeMap<(Uuid, Uuid), SeverityVote>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Next `create_priority_vote` behaves as if a concurrent toggle won the race.
    pub race_next_create: AtomicBool,
    pub fail_counter_updates: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, report: Report) -> Uuid {
        let id = report.id;
        self.state.lock().unwrap().reports.insert(id, report);
        id
    }

    pub fn report(&self, id: Uuid) -> Report {
        self.state.lock().unwrap().reports[&id].clone()
    }

    pub fn set_counter(&self, id: Uuid, value: i64) {
        if let Some(r) = self.state.lock().unwrap().reports.get_mut(&id) {
            r.priority_count = value;
        }
    }

    pub fn priority_rows(&self, report_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .priority_votes
            .iter()
            .filter(|(r, _)| *r == report_id)
            .count()
    }

    pub fn severity_rows(&self, report_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .severity_votes
            .keys()
            .filter(|(r, _)| *r == report_id)
            .count()
    }
}

pub fn report(city_id: Uuid, title: &str, created_at: DateTime<Utc>) -> Report {
    Report {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        category: "OTHER".to_string(),
        status: ReportStatus::Open,
        city_id,
        coordinates: None,
        created_at,
        priority_count: 0,
        deleted: false,
    }
}

struct MemoryTx<'a> {
    state: State,
    store: &'a MemoryStore,
}

impl VoteTransaction for MemoryTx<'_> {
    fn report(&mut self, report_id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.state.reports.get(&report_id).cloned())
    }

    fn delete_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.priority_votes.remove(&(report_id, user_id)))
    }

    fn create_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        if self.store.race_next_create.swap(false, Ordering::SeqCst) {
            self.state.priority_votes.insert((report_id, user_id));
            if let Some(r) = self.state.reports.get_mut(&report_id) {
                r.priority_count += 1;
            }
        }
        if !self.state.priority_votes.insert((report_id, user_id)) {
            return Err(StoreError::UniqueViolation("priority_votes(report_id, user_id)".into()));
        }
        Ok(())
    }

    fn update_report_counter(&mut self, report_id: Uuid, delta: i64) -> Result<i64, StoreError> {
        if self.store.fail_counter_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow!("counter update failed")));
        }
        let report = self
            .state
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| StoreError::Backend(anyhow!("no report {}", report_id)))?;
        report.priority_count += delta;
        Ok(report.priority_count)
    }

    fn set_report_counter(&mut self, report_id: Uuid, value: i64) -> Result<(), StoreError> {
        if let Some(r) = self.state.reports.get_mut(&report_id) {
            r.priority_count = value;
        }
        Ok(())
    }

    fn upsert_severity_vote(
        &mut self,
        report_id: Uuid,
        user_id: Uuid,
        severity: u8,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.state
            .severity_votes
            .entry((report_id, user_id))
            .and_modify(|v| {
                v.severity = severity;
                v.updated_at = at;
            })
            .or_insert(SeverityVote {
                report_id,
                user_id,
                severity,
                created_at: at,
                updated_at: at,
            });
        Ok(())
    }
}

impl ReportStore for MemoryStore {
    fn find_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Report> = state
            .reports
            .values()
            .filter(|r| r.city_id == filter.city_id)
            .filter(|r| filter.include_deleted || !r.deleted)
            .filter(|r| filter.statuses.is_empty() || filter.statuses.contains(&r.status))
            .filter(|r| filter.created_since.is_none_or(|since| r.created_at >= since))
            .filter(|r| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| r.category.eq_ignore_ascii_case(c))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            found.truncate(limit as usize);
        }
        Ok(found)
    }

    fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.state.lock().unwrap().reports.get(&report_id).cloned())
    }

    fn has_priority_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().priority_votes.contains(&(report_id, user_id)))
    }

    fn severity_votes(&self, report_id: Uuid) -> Result<Vec<SeverityVote>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .severity_votes
            .values()
            .filter(|v| v.report_id == report_id)
            .cloned()
            .collect())
    }

    fn severity_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<Option<SeverityVote>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .severity_votes
            .get(&(report_id, user_id))
            .cloned())
    }

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn VoteTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.state.lock().unwrap();
        let mut tx = MemoryTx {
            state: guard.clone(),
            store: self,
        };
        let out = f(&mut tx)?;
        *guard = tx.state;
        Ok(out)
    }
}
