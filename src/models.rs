use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A single telemetry sample from the `records` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Record {
    pub client: String,
    pub time: DateTime<Utc>,
    pub cpu: f64,
    pub gpu: f64,
    pub ram: i64,
    pub ram_total: i64,
    pub swap: i64,
    pub swap_total: i64,
    pub load: f64,
    pub temp: f64,
    pub disk: i64,
    pub disk_total: i64,
    pub net_in: i64,
    pub net_out: i64,
    pub net_total_up: i64,
    pub net_total_down: i64,
    pub process: i64,
    pub connections: i64,
    pub connections_udp: i64,
}

/// The runtime-editable settings row.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct Settings {
    pub geoip_enabled: bool,
}

/// Closed time range `[start, end]` passed to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `hours` leading up to `end`, or `None` when `start` would fall
    /// outside the representable date range. Callers validate `hours >= 0`,
    /// so `start <= end` holds.
    pub fn lookback(end: DateTime<Utc>, hours: i64) -> Option<Self> {
        let start = end.checked_sub_signed(Duration::try_hours(hours)?)?;
        Some(Self { start, end })
    }
}

/// Body of a successful record query.
#[derive(Debug, Serialize)]
pub struct RecordsPayload {
    pub records: Vec<Record>,
    pub count: usize,
}

impl From<Vec<Record>> for RecordsPayload {
    fn from(records: Vec<Record>) -> Self {
        let count = records.len();
        Self { records, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lookback_window_ends_at_reference_time() {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::lookback(end, 4).unwrap();
        assert_eq!(window.end, end);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn zero_lookback_is_a_point_window() {
        let end = Utc::now();
        let window = TimeWindow::lookback(end, 0).unwrap();
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn unrepresentable_lookback_is_none() {
        let end = Utc::now();
        assert!(TimeWindow::lookback(end, 100_000_000_000).is_none());
        assert!(TimeWindow::lookback(end, i64::MAX).is_none());
    }
}
