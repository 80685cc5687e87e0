#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use civic_db::Database;
use civic_types::{Coordinates, DraftReport, Report, ReportStatus};

pub fn report(city_id: Uuid, title: &str, description: &str) -> Report {
    Report {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        category: "OTHER".to_string(),
        status: ReportStatus::Open,
        city_id,
        coordinates: None,
        created_at: Utc::now() - TimeDelta::hours(1),
        priority_count: 0,
        deleted: false,
    }
}

pub fn located(mut report: Report, lat: f64, lon: f64) -> Report {
    report.coordinates = Some(Coordinates::new(lat, lon));
    report
}

pub fn aged(mut report: Report, age: TimeDelta) -> Report {
    report.created_at = Utc::now() - age;
    report
}

pub fn draft(city_id: Uuid, title: &str, description: &str, at: DateTime<Utc>) -> DraftReport {
    DraftReport {
        title: title.to_string(),
        description: description.to_string(),
        category: "OTHER".to_string(),
        city_id,
        coordinates: None,
        submitted_at: at,
    }
}

pub fn seeded(reports: &[Report]) -> Database {
    let db = Database::open_in_memory().unwrap();
    for r in reports {
        db.insert_report(r).unwrap();
    }
    db
}
