use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (reports and votes)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE reports (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                category        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'OPEN'
                                CHECK (status IN ('OPEN', 'IN_PROGRESS', 'RESOLVED', 'CLOSED')),
                city_id         TEXT NOT NULL,
                lat             REAL,
                lon             REAL,
                created_at      TEXT NOT NULL,
                priority_count  INTEGER NOT NULL DEFAULT 0,
                deleted         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_reports_city_created
                ON reports(city_id, created_at);

            CREATE TABLE priority_votes (
                id          TEXT PRIMARY KEY,
                report_id   TEXT NOT NULL REFERENCES reports(id),
                user_id     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(report_id, user_id)
            );

            CREATE TABLE severity_votes (
                id          TEXT PRIMARY KEY,
                report_id   TEXT NOT NULL REFERENCES reports(id),
                user_id     TEXT NOT NULL,
                severity    INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 10),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(report_id, user_id)
            );

            CREATE INDEX idx_severity_votes_report
                ON severity_votes(report_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
