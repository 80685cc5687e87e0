use chrono::{DateTime, Utc};
use uuid::Uuid;

use civic_types::{SeverityAggregate, Voter};

use crate::error::{CoreError, Result};
use crate::priority::{ensure_may_vote, live_report};
use crate::store::ReportStore;

pub const MIN_SEVERITY: i64 = 1;
pub const MAX_SEVERITY: i64 = 10;

pub fn validate_severity(severity: i64) -> Result<u8> {
    if (MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        Ok(severity as u8)
    } else {
        Err(CoreError::validation(format!(
            "severity must be between {} and {}, got {}",
            MIN_SEVERITY, MAX_SEVERITY, severity
        )))
    }
}

/// Record or overwrite the voter's severity for a report and return the
/// aggregate as it stands afterwards.
pub fn record_severity<S: ReportStore>(
    store: &S,
    voter: &Voter,
    report_id: Uuid,
    severity: i64,
    now: DateTime<Utc>,
) -> Result<SeverityAggregate> {
    let severity = validate_severity(severity)?;
    ensure_may_vote(voter)?;

    store.transaction(|tx| -> Result<()> {
        live_report(tx, report_id)?;
        tx.upsert_severity_vote(report_id, voter.user_id, severity, now)?;
        Ok(())
    })?;

    get_aggregate(store, report_id)
}

/// Computed on read from the vote rows.
pub fn get_aggregate<S: ReportStore>(store: &S, report_id: Uuid) -> Result<SeverityAggregate> {
    ensure_live(store, report_id)?;
    let votes = store.severity_votes(report_id)?;
    Ok(summarize(report_id, votes.iter().map(|v| v.severity)))
}

pub fn user_severity<S: ReportStore>(store: &S, report_id: Uuid, user_id: Uuid) -> Result<Option<u8>> {
    ensure_live(store, report_id)?;
    Ok(store.severity_vote(report_id, user_id)?.map(|v| v.severity))
}

fn ensure_live<S: ReportStore>(store: &S, report_id: Uuid) -> Result<()> {
    match store.get_report(report_id)? {
        Some(report) if !report.deleted => Ok(()),
        _ => Err(CoreError::NotFound(report_id)),
    }
}

/// Count, mean and 1..=10 histogram. Out-of-range values are ignored.
pub fn summarize(report_id: Uuid, severities: impl IntoIterator<Item = u8>) -> SeverityAggregate {
    let mut histogram = [0u32; 10];
    let mut count = 0u32;
    let mut sum = 0u64;
    for severity in severities {
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&i64::from(severity)) {
            continue;
        }
        histogram[usize::from(severity) - 1] += 1;
        count += 1;
        sum += u64::from(severity);
    }

    SeverityAggregate {
        report_id,
        count,
        mean: (count > 0).then(|| sum as f64 / f64::from(count)),
        histogram,
    }
}
