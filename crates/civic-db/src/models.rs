//! Database row types — these map directly to SQLite rows.
//! Distinct from civic-types models to keep the DB layer independent.
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use civic_types::{Coordinates, Report, SeverityVote};

/// Column list matching `ReportRow::from_row`.
pub const REPORT_COLUMNS: &str =
    "id, title, description, category, status, city_id, lat, lon, created_at, priority_count, deleted";

pub const SEVERITY_COLUMNS: &str = "report_id, user_id, severity, created_at, updated_at";

pub struct ReportRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub city_id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: String,
    pub priority_count: i64,
    pub deleted: bool,
}

impl ReportRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            status: row.get(4)?,
            city_id: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
            created_at: row.get(8)?,
            priority_count: row.get(9)?,
            deleted: row.get(10)?,
        })
    }

    pub fn into_report(self) -> Result<Report> {
        let coordinates = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        };
        Ok(Report {
            id: parse_uuid(&self.id).with_context(|| format!("report id '{}'", self.id))?,
            status: self
                .status
                .parse()
                .map_err(|e: String| anyhow!("report {}: {}", self.id, e))?,
            city_id: parse_uuid(&self.city_id)
                .with_context(|| format!("city_id on report '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("created_at on report '{}'", self.id))?,
            title: self.title,
            description: self.description,
            category: self.category,
            coordinates,
            priority_count: self.priority_count,
            deleted: self.deleted,
        })
    }
}

pub struct SeverityVoteRow {
    pub report_id: String,
    pub user_id: String,
    pub severity: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl SeverityVoteRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            report_id: row.get(0)?,
            user_id: row.get(1)?,
            severity: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    pub fn into_vote(self) -> Result<SeverityVote> {
        Ok(SeverityVote {
            report_id: parse_uuid(&self.report_id)?,
            user_id: parse_uuid(&self.user_id)?,
            severity: u8::try_from(self.severity)
                .with_context(|| format!("severity {} out of range", self.severity))?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Fixed-width UTC timestamps so that string order is time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow!("corrupt timestamp '{}': {}", raw, e))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>()
        .map_err(|e| anyhow!("corrupt uuid '{}': {}", raw, e))
}
