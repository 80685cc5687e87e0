use chrono::{DateTime, Utc};
use rusqlite::{TransactionBehavior, ffi};
use uuid::Uuid;

use civic_core::{ReportFilter, ReportStore, StoreError, VoteTransaction};
use civic_types::{Report, SeverityVote};

use crate::Database;
use crate::models::{SeverityVoteRow, format_timestamp};
use crate::queries::{
    query_has_priority_vote, query_report, query_reports, query_severity_vote, query_severity_votes,
};

/// One IMMEDIATE SQLite transaction. Dropping it without `commit` rolls back.
struct SqliteVoteTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl VoteTransaction for SqliteVoteTx<'_> {
    fn report(&mut self, report_id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(query_report(&self.tx, report_id)?)
    }

    fn delete_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let removed = self
            .tx
            .execute(
                "DELETE FROM priority_votes WHERE report_id = ?1 AND user_id = ?2",
                [report_id.to_string(), user_id.to_string()],
            )
            .map_err(backend)?;
        Ok(removed > 0)
    }

    fn create_priority_vote(&mut self, report_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO priority_votes (id, report_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                [
                    Uuid::new_v4().to_string(),
                    report_id.to_string(),
                    user_id.to_string(),
                    format_timestamp(Utc::now()),
                ],
            )
            .map_err(constraint_or_backend)?;
        Ok(())
    }

    fn update_report_counter(&mut self, report_id: Uuid, delta: i64) -> Result<i64, StoreError> {
        self.tx
            .query_row(
                "UPDATE reports SET priority_count = priority_count + ?2 WHERE id = ?1 RETURNING priority_count",
                (report_id.to_string(), delta),
                |row| row.get(0),
            )
            .map_err(backend)
    }

    fn set_report_counter(&mut self, report_id: Uuid, value: i64) -> Result<(), StoreError> {
        self.tx
            .execute(
                "UPDATE reports SET priority_count = ?2 WHERE id = ?1",
                (report_id.to_string(), value),
            )
            .map_err(backend)?;
        Ok(())
    }

    fn upsert_severity_vote(
        &mut self,
        report_id: Uuid,
        user_id: Uuid,
        severity: u8,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let at = format_timestamp(at);
        self.tx
            .execute(
                "INSERT INTO severity_votes (id, report_id, user_id, severity, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(report_id, user_id)
                 DO UPDATE SET severity = excluded.severity, updated_at = excluded.updated_at",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    report_id.to_string(),
                    user_id.to_string(),
                    severity,
                    at,
                ],
            )
            .map_err(backend)?;
        Ok(())
    }
}

impl ReportStore for Database {
    fn find_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, StoreError> {
        Ok(self.with_conn(|conn| query_reports(conn, filter))?)
    }

    fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.with_conn(|conn| query_report(conn, report_id))?)
    }

    fn has_priority_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.with_conn(|conn| query_has_priority_vote(conn, report_id, user_id))?)
    }

    fn severity_votes(&self, report_id: Uuid) -> Result<Vec<SeverityVote>, StoreError> {
        let rows = self.with_conn(|conn| query_severity_votes(conn, report_id))?;
        Ok(rows
            .into_iter()
            .map(SeverityVoteRow::into_vote)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    fn severity_vote(&self, report_id: Uuid, user_id: Uuid) -> Result<Option<SeverityVote>, StoreError> {
        let row = self.with_conn(|conn| query_severity_vote(conn, report_id, user_id))?;
        Ok(row.map(SeverityVoteRow::into_vote).transpose()?)
    }

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn VoteTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock().map_err(|e| E::from(StoreError::Backend(e)))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| E::from(backend(e)))?;

        let mut vote_tx = SqliteVoteTx { tx };
        let out = f(&mut vote_tx)?;
        vote_tx.tx.commit().map_err(|e| E::from(backend(e)))?;
        Ok(out)
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.into())
}

/// Unique and primary-key violations map to `UniqueViolation`; anything
/// else (including foreign-key failures) is a backend error.
fn constraint_or_backend(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, msg) = &err {
        if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return StoreError::UniqueViolation(msg.clone().unwrap_or_else(|| code.to_string()));
        }
    }
    backend(err)
}
