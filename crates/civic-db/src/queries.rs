use anyhow::Result;
use chrono::Datelike;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use civic_core::ReportFilter;
use civic_types::{Report, ReportStatus};

use crate::Database;
use crate::models::{REPORT_COLUMNS, ReportRow, SEVERITY_COLUMNS, SeverityVoteRow, format_timestamp};

impl Database {
    // -- Reports --

    pub fn insert_report(&self, report: &Report) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, title, description, category, status, city_id, lat, lon, created_at, priority_count, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    report.id.to_string(),
                    report.title,
                    report.description,
                    report.category,
                    report.status.as_str(),
                    report.city_id.to_string(),
                    report.coordinates.map(|c| c.lat),
                    report.coordinates.map(|c| c.lon),
                    format_timestamp(report.created_at),
                    report.priority_count,
                    report.deleted,
                ],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_report(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE reports SET deleted = 1 WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    pub fn set_report_status(&self, id: Uuid, status: ReportStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reports SET status = ?2 WHERE id = ?1",
                (id.to_string(), status.as_str()),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Votes --

    /// Live priority vote rows for a report. Never used on the hot path; the
    /// denormalized `priority_count` is what callers read.
    pub fn count_priority_votes(&self, report_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM priority_votes WHERE report_id = ?1",
                [report_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn count_severity_votes(&self, report_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM severity_votes WHERE report_id = ?1",
                [report_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

pub(crate) fn query_report(conn: &Connection, id: Uuid) -> Result<Option<Report>> {
    let sql = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], ReportRow::from_row)
        .optional()?;

    row.map(ReportRow::into_report).transpose()
}

pub(crate) fn query_reports(conn: &Connection, filter: &ReportFilter) -> Result<Vec<Report>> {
    let mut sql = format!("SELECT {} FROM reports WHERE city_id = ?", REPORT_COLUMNS);
    let mut params: Vec<Value> = vec![Value::Text(filter.city_id.to_string())];

    if !filter.include_deleted {
        sql.push_str(" AND deleted = 0");
    }

    if !filter.statuses.is_empty() {
        let placeholders = vec!["?"; filter.statuses.len()].join(", ");
        sql.push_str(&format!(" AND status IN ({})", placeholders));
        params.extend(filter.statuses.iter().map(|s| Value::Text(s.as_str().to_string())));
    }

    // Timestamps before year 1 would not sort as strings; such a bound excludes nothing.
    if let Some(since) = filter.created_since.filter(|ts| ts.year() >= 1) {
        sql.push_str(" AND created_at >= ?");
        params.push(Value::Text(format_timestamp(since)));
    }

    if let Some(category) = &filter.category {
        sql.push_str(" AND category = ? COLLATE NOCASE");
        params.push(Value::Text(category.clone()));
    }

    sql.push_str(" ORDER BY created_at DESC, id ASC");

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), ReportRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(ReportRow::into_report).collect()
}

pub(crate) fn query_severity_votes(conn: &Connection, report_id: Uuid) -> Result<Vec<SeverityVoteRow>> {
    let sql = format!(
        "SELECT {} FROM severity_votes WHERE report_id = ?1 ORDER BY user_id",
        SEVERITY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([report_id.to_string()], SeverityVoteRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn query_severity_vote(
    conn: &Connection,
    report_id: Uuid,
    user_id: Uuid,
) -> Result<Option<SeverityVoteRow>> {
    let sql = format!(
        "SELECT {} FROM severity_votes WHERE report_id = ?1 AND user_id = ?2",
        SEVERITY_COLUMNS
    );
    let row = conn
        .query_row(&sql, [report_id.to_string(), user_id.to_string()], SeverityVoteRow::from_row)
        .optional()?;
    Ok(row)
}

pub(crate) fn query_has_priority_vote(conn: &Connection, report_id: Uuid, user_id: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM priority_votes WHERE report_id = ?1 AND user_id = ?2",
            [report_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
