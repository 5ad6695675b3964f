use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{RecordsPayload, TimeWindow},
    response::ApiResponse,
    store::RecordStore,
    AppState,
};

/// Lookback used when `hours` is omitted or empty.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 4;

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    uuid: Option<String>,
    hours: Option<String>,
}

/// GET /api/admin/records?uuid=<client>&hours=<n>
pub async fn get_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> AppResult<Json<ApiResponse<RecordsPayload>>> {
    let payload = load_records(
        state.records.as_ref(),
        query.uuid.as_deref(),
        query.hours.as_deref(),
        state.config.max_lookback_hours,
    )
    .await?;

    Ok(ApiResponse::ok(payload))
}

/// Validate the query, then fetch the client's records for the last `hours`.
/// The store is only consulted once both inputs are valid.
pub async fn load_records(
    store: &dyn RecordStore,
    uuid: Option<&str>,
    hours: Option<&str>,
    max_lookback_hours: i64,
) -> AppResult<RecordsPayload> {
    let client = match uuid {
        Some(u) if !u.is_empty() => u,
        _ => return Err(AppError::validation("UUID is required")),
    };
    let hours = parse_lookback(hours, max_lookback_hours)?;

    let window = TimeWindow::lookback(Utc::now(), hours)
        .ok_or_else(|| AppError::validation("hours is too large"))?;

    let records = store.query(client, window).await.map_err(|e| {
        tracing::error!(client, error = %e, "Record query failed");
        AppError::upstream("Failed to fetch records", e)
    })?;

    Ok(records.into())
}

/// Parse the `hours` parameter, defaulting to [`DEFAULT_LOOKBACK_HOURS`].
pub fn parse_lookback(hours: Option<&str>, max_lookback_hours: i64) -> AppResult<i64> {
    let hours = match hours.map(str::trim).filter(|h| !h.is_empty()) {
        None => return Ok(DEFAULT_LOOKBACK_HOURS),
        Some(h) => h
            .parse::<i64>()
            .map_err(|_| AppError::validation("Invalid hours parameter"))?,
    };

    if !(0..=max_lookback_hours).contains(&hours) {
        return Err(AppError::validation(format!(
            "hours must be between 0 and {max_lookback_hours}"
        )));
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    const MAX: i64 = 720;

    #[derive(Default)]
    struct FakeStore {
        calls: Mutex<Vec<(String, TimeWindow)>>,
        records: Vec<Record>,
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn query(&self, client: &str, window: TimeWindow) -> anyhow::Result<Vec<Record>> {
            self.calls.lock().unwrap().push((client.to_owned(), window));
            match self.fail_with {
                Some(msg) => Err(anyhow::anyhow!(msg)),
                None => Ok(self.records.clone()),
            }
        }
    }

    fn sample(client: &str, minutes_ago: i64) -> Record {
        Record {
            client: client.into(),
            time: Utc::now() - Duration::minutes(minutes_ago),
            cpu: 12.5,
            gpu: 0.0,
            ram: 1 << 30,
            ram_total: 4 << 30,
            swap: 0,
            swap_total: 0,
            load: 0.4,
            temp: 45.0,
            disk: 10 << 30,
            disk_total: 50 << 30,
            net_in: 1200,
            net_out: 800,
            net_total_up: 1_000_000,
            net_total_down: 2_000_000,
            process: 120,
            connections: 30,
            connections_udp: 4,
        }
    }

    fn assert_validation(err: AppError, expected: &str) {
        match err {
            AppError::Validation(msg) => assert_eq!(msg, expected),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_or_empty_uuid_is_rejected_without_store_call() {
        let store = FakeStore::default();

        for uuid in [None, Some("")] {
            let err = load_records(&store, uuid, Some("2"), MAX).await.unwrap_err();
            assert_validation(err, "UUID is required");
        }
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_integer_hours_is_rejected_without_store_call() {
        let store = FakeStore::default();

        for hours in ["abc", "1.5", "4h", "0x10"] {
            let err = load_records(&store, Some("dev-1"), Some(hours), MAX)
                .await
                .unwrap_err();
            assert_validation(err, "Invalid hours parameter");
        }
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_hours_is_rejected_without_store_call() {
        let store = FakeStore::default();

        for hours in ["-1", "721"] {
            let err = load_records(&store, Some("dev-1"), Some(hours), MAX)
                .await
                .unwrap_err();
            assert_validation(err, "hours must be between 0 and 720");
        }
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn omitted_hours_defaults_to_four_hour_window() {
        let store = FakeStore::default();

        for hours in [None, Some("")] {
            let before = Utc::now();
            load_records(&store, Some("dev-1"), hours, MAX).await.unwrap();
            let after = Utc::now();

            let (client, window) = store.calls.lock().unwrap().pop().unwrap();
            assert_eq!(client, "dev-1");
            assert!(window.end >= before && window.end <= after);
            assert_eq!(window.end - window.start, Duration::hours(4));
        }
    }

    #[tokio::test]
    async fn explicit_hours_sets_window_length() {
        let store = FakeStore::default();
        load_records(&store, Some("dev-1"), Some("24"), MAX).await.unwrap();

        let (_, window) = store.calls.lock().unwrap().pop().unwrap();
        assert_eq!(window.end - window.start, Duration::hours(24));
    }

    #[tokio::test]
    async fn count_matches_records_returned() {
        let empty = FakeStore::default();
        let payload = load_records(&empty, Some("dev-1"), None, MAX).await.unwrap();
        assert_eq!(payload.count, 0);
        assert!(payload.records.is_empty());

        let store = FakeStore {
            records: vec![sample("dev-1", 90), sample("dev-1", 60), sample("dev-1", 30)],
            ..Default::default()
        };
        let payload = load_records(&store, Some("dev-1"), None, MAX).await.unwrap();
        assert_eq!(payload.count, 3);
        assert_eq!(payload.count, payload.records.len());
    }

    #[tokio::test]
    async fn store_failure_is_upstream_with_detail() {
        let store = FakeStore {
            fail_with: Some("database is locked"),
            ..Default::default()
        };

        let err = load_records(&store, Some("dev-1"), None, MAX).await.unwrap_err();
        match err {
            AppError::Upstream(msg) => {
                assert_eq!(msg, "Failed to fetch records: database is locked")
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn overflowing_hours_is_rejected_without_store_call() {
        let store = FakeStore::default();

        for hours in ["100000000000", "9223372036854775807"] {
            let err = load_records(&store, Some("dev-1"), Some(hours), i64::MAX)
                .await
                .unwrap_err();
            assert_validation(err, "hours is too large");
        }
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn parse_lookback_accepts_bounds() {
        assert_eq!(parse_lookback(Some("0"), MAX).unwrap(), 0);
        assert_eq!(parse_lookback(Some("720"), MAX).unwrap(), 720);
        assert_eq!(parse_lookback(Some(" 12 "), MAX).unwrap(), 12);
    }
}
