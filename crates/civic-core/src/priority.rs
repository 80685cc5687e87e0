use tracing::{debug, warn};
use uuid::Uuid;

use civic_types::{PriorityToggle, Report, Voter};

use crate::error::{CoreError, Result, StoreError};
use crate::store::{ReportStore, VoteTransaction};

/// Toggle the voter's priority vote on a report: removes it if present,
/// inserts it if not. Row mutation and counter update share one transaction.
///
/// A unique-constraint violation on insert means a concurrent toggle by the
/// same user already created the row; the vote is then reported as cast
/// without touching the counter again.
pub fn toggle_vote<S: ReportStore>(store: &S, voter: &Voter, report_id: Uuid) -> Result<PriorityToggle> {
    ensure_may_vote(voter)?;

    store.transaction(|tx| -> Result<PriorityToggle> {
        let report = live_report(tx, report_id)?;

        if tx.delete_priority_vote(report_id, voter.user_id)? {
            let raw = tx.update_report_counter(report_id, -1)?;
            let priority_count = settle_counter(tx, report_id, raw, 0)?;
            return Ok(PriorityToggle {
                has_voted: false,
                priority_count,
            });
        }

        match tx.create_priority_vote(report_id, voter.user_id) {
            Ok(()) => {
                let raw = tx.update_report_counter(report_id, 1)?;
                let priority_count = settle_counter(tx, report_id, raw, 1)?;
                Ok(PriorityToggle {
                    has_voted: true,
                    priority_count,
                })
            }
            Err(StoreError::UniqueViolation(detail)) => {
                debug!(
                    "Priority vote by {} on {} already present ({}); treating as cast",
                    voter.user_id, report_id, detail
                );
                let current = tx
                    .report(report_id)?
                    .map_or(report.priority_count, |r| r.priority_count);
                Ok(PriorityToggle {
                    has_voted: true,
                    priority_count: settle_counter(tx, report_id, current, 1)?,
                })
            }
            Err(e) => Err(e.into()),
        }
    })
}

/// Repairs a counter that has drifted below `floor`, the least value
/// consistent with the voter's row being present (1) or absent (0).
/// Returns the stored count.
fn settle_counter(tx: &mut dyn VoteTransaction, report_id: Uuid, raw: i64, floor: i64) -> Result<i64> {
    if raw >= floor {
        return Ok(raw);
    }
    warn!(
        "priority_count for report {} drifted to {}; resetting to {}",
        report_id, raw, floor
    );
    tx.set_report_counter(report_id, floor)?;
    Ok(floor)
}

pub fn has_priority_vote<S: ReportStore>(store: &S, report_id: Uuid, user_id: Uuid) -> Result<bool> {
    Ok(store.has_priority_vote(report_id, user_id)?)
}

pub(crate) fn ensure_may_vote(voter: &Voter) -> Result<()> {
    if voter.role.may_vote() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "role {:?} may not vote on reports",
            voter.role
        )))
    }
}

/// The report, if it exists and is not soft-deleted.
pub(crate) fn live_report(tx: &mut dyn VoteTransaction, report_id: Uuid) -> Result<Report> {
    match tx.report(report_id)? {
        Some(report) if !report.deleted => Ok(report),
        _ => Err(CoreError::NotFound(report_id)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Utc;

    use civic_types::Role;

    use super::*;
    use crate::memory::{MemoryStore, report};

    fn setup() -> (MemoryStore, Uuid) {
        let store = MemoryStore::default();
        let id = store.insert(report(Uuid::new_v4(), "Pothole", Utc::now()));
        (store, id)
    }

    #[test]
    fn toggle_twice_round_trips() {
        let (store, id) = setup();
        let voter = Voter::citizen(Uuid::new_v4());

        let first = toggle_vote(&store, &voter, id).unwrap();
        assert_eq!(first, PriorityToggle { has_voted: true, priority_count: 1 });
        assert!(has_priority_vote(&store, id, voter.user_id).unwrap());

        let second = toggle_vote(&store, &voter, id).unwrap();
        assert_eq!(second, PriorityToggle { has_voted: false, priority_count: 0 });
        assert_eq!(store.priority_rows(id), 0);
        assert_eq!(store.report(id).priority_count, 0);
    }

    #[test]
    fn counter_tracks_rows_across_users() {
        let (store, id) = setup();
        let voters: Vec<Voter> = (0..4).map(|_| Voter::citizen(Uuid::new_v4())).collect();
        for v in &voters {
            toggle_vote(&store, v, id).unwrap();
        }
        toggle_vote(&store, &voters[0], id).unwrap();

        assert_eq!(store.priority_rows(id), 3);
        assert_eq!(store.report(id).priority_count, 3);
    }

    #[test]
    fn only_citizens_vote() {
        let (store, id) = setup();
        for role in [Role::Authority, Role::Admin] {
            let voter = Voter { user_id: Uuid::new_v4(), role };
            assert!(matches!(toggle_vote(&store, &voter, id), Err(CoreError::Forbidden(_))));
        }
        assert_eq!(store.report(id).priority_count, 0);
    }

    #[test]
    fn missing_or_deleted_report_is_not_found() {
        let (store, id) = setup();
        let voter = Voter::citizen(Uuid::new_v4());
        assert!(matches!(toggle_vote(&store, &voter, Uuid::new_v4()), Err(CoreError::NotFound(_))));

        let mut gone = store.report(id);
        gone.deleted = true;
        store.insert(gone);
        assert!(matches!(toggle_vote(&store, &voter, id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn lost_insert_race_is_not_double_counted() {
        let (store, id) = setup();
        let voter = Voter::citizen(Uuid::new_v4());
        store.race_next_create.store(true, Ordering::SeqCst);

        let result = toggle_vote(&store, &voter, id).unwrap();
        assert_eq!(result, PriorityToggle { has_voted: true, priority_count: 1 });
        assert_eq!(store.priority_rows(id), 1);
        assert_eq!(store.report(id).priority_count, 1);
    }

    #[test]
    fn drifted_counter_is_clamped() {
        let (store, id) = setup();
        let voter = Voter::citizen(Uuid::new_v4());
        toggle_vote(&store, &voter, id).unwrap();
        store.set_counter(id, 0);

        let result = toggle_vote(&store, &voter, id).unwrap();
        assert_eq!(result.priority_count, 0);
        assert_eq!(store.report(id).priority_count, 0);
    }

    #[test]
    fn negative_counter_is_repaired_on_vote() {
        let (store, id) = setup();
        store.set_counter(id, -3);

        let result = toggle_vote(&store, &Voter::citizen(Uuid::new_v4()), id).unwrap();
        assert_eq!(result, PriorityToggle { has_voted: true, priority_count: 1 });
        assert_eq!(store.report(id).priority_count, 1);
    }

    #[test]
    fn negative_counter_is_repaired_when_race_is_lost() {
        let (store, id) = setup();
        store.set_counter(id, -3);
        store.race_next_create.store(true, Ordering::SeqCst);

        let result = toggle_vote(&store, &Voter::citizen(Uuid::new_v4()), id).unwrap();
        assert_eq!(result, PriorityToggle { has_voted: true, priority_count: 1 });
        assert_eq!(store.report(id).priority_count, 1);
        assert_eq!(store.priority_rows(id), 1);
    }

    #[test]
    fn failed_counter_update_rolls_back_vote() {
        let (store, id) = setup();
        let voter = Voter::citizen(Uuid::new_v4());
        store.fail_counter_updates.store(true, Ordering::SeqCst);

        let err = toggle_vote(&store, &voter, id).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.priority_rows(id), 0);
        assert_eq!(store.report(id).priority_count, 0);
    }
}
