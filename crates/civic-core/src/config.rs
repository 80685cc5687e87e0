use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;

/// Lookback period for duplicate candidates.
pub const DEFAULT_RECENCY_WINDOW_DAYS: i64 = 60;
/// Upper bound on reports scored per duplicate check.
pub const DEFAULT_MAX_CANDIDATES: u32 = 200;
pub const DEFAULT_DUPLICATE_RADIUS_METERS: f64 = 500.0;
/// Minimum combined score for a candidate to be reported.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_MATCHES: usize = 5;
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Tunables for duplicate detection, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub recency_window: TimeDelta,
    pub max_candidates: u32,
    pub radius_meters: f64,
    pub threshold: f64,
    pub max_matches: usize,
    /// Only consider candidates of the draft's category.
    pub restrict_to_category: bool,
    pub check_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            recency_window: TimeDelta::days(DEFAULT_RECENCY_WINDOW_DAYS),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            radius_meters: DEFAULT_DUPLICATE_RADIUS_METERS,
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            max_matches: DEFAULT_MAX_MATCHES,
            restrict_to_category: false,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }
}

impl CoreConfig {
    /// Load from `CIVIC_*` environment variables, reading `.env` if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let window_days = env_or("CIVIC_RECENCY_WINDOW_DAYS", DEFAULT_RECENCY_WINDOW_DAYS)?;
        let config = Self {
            recency_window: TimeDelta::try_days(window_days)
                .with_context(|| format!("CIVIC_RECENCY_WINDOW_DAYS out of range: {}", window_days))?,
            max_candidates: env_or("CIVIC_MAX_CANDIDATES", defaults.max_candidates)?,
            radius_meters: env_or("CIVIC_DUPLICATE_RADIUS_METERS", defaults.radius_meters)?,
            threshold: env_or("CIVIC_DUPLICATE_THRESHOLD", defaults.threshold)?,
            max_matches: env_or("CIVIC_MAX_MATCHES", defaults.max_matches)?,
            restrict_to_category: env_or("CIVIC_RESTRICT_TO_CATEGORY", defaults.restrict_to_category)?,
            check_timeout: Duration::from_millis(env_or(
                "CIVIC_CHECK_TIMEOUT_MS",
                DEFAULT_CHECK_TIMEOUT.as_millis() as u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recency_window <= TimeDelta::zero() {
            bail!("recency window must be positive");
        }
        if self.max_candidates == 0 || self.max_matches == 0 {
            bail!("candidate and match limits must be at least 1");
        }
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            bail!("duplicate radius must be a positive number of meters");
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("duplicate threshold must be within 0.0..=1.0");
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_var(key, env::var(key).ok().as_deref(), default)
}

/// `default` when unset; otherwise the parsed value or an error naming `key`.
fn parse_var<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
