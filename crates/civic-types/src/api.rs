use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ReportStatus;

// -- Duplicate detection --

/// One candidate returned by a duplicate check. Request-scoped, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub report_id: Uuid,
    pub title: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    /// Text similarity of title and description, 0.0–1.0.
    pub similarity: f64,
    /// Blend of text similarity, proximity bonus and category bonus, 0.0–1.0.
    pub score: f64,
    /// `None` when either side has no coordinates.
    pub distance_meters: Option<f64>,
    pub excerpt: String,
    pub priority_count: i64,
}

// -- Priority votes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityToggle {
    pub has_voted: bool,
    pub priority_count: i64,
}

/// Display bucket for a report's priority count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
}

impl PriorityLevel {
    pub const MEDIUM_AT: i64 = 5;
    pub const HIGH_AT: i64 = 10;

    pub fn from_count(count: i64) -> Self {
        if count >= Self::HIGH_AT {
            Self::High
        } else if count >= Self::MEDIUM_AT {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

// -- Severity votes --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityAggregate {
    pub report_id: Uuid,
    pub count: u32,
    /// `None` until the first vote is cast.
    pub mean: Option<f64>,
    /// `histogram[i]` counts votes of severity `i + 1`.
    pub histogram: [u32; 10],
}
