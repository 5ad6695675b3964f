use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, HeaderName},
    Json,
};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::{
    error::{AppError, AppResult},
    geo::{GeoRecord, GeoResolver},
    notify::NotificationChannel,
    response::ApiResponse,
    store::ConfigStore,
    AppState,
};

pub const TEST_MESSAGE: &str = "Outpost test message.";

#[derive(Debug, Deserialize)]
pub struct GeoIpQuery {
    ip: Option<String>,
}

// ── Notification ───────────────────────────────────────────────────────────

/// POST /api/admin/test/notification
///
/// Every call delivers a real message.
pub async fn test_notification(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<()>>> {
    send_test_notification(state.notifier.as_ref()).await?;
    Ok(ApiResponse::<()>::empty())
}

pub async fn send_test_notification(channel: &dyn NotificationChannel) -> AppResult<()> {
    channel
        .send(TEST_MESSAGE)
        .await
        .map_err(|e| AppError::upstream("Failed to send notification", e))?;

    tracing::info!("Test notification sent");
    Ok(())
}

// ── Geolocation ────────────────────────────────────────────────────────────

/// GET /api/admin/test/geoip?ip=<addr>
pub async fn test_geoip(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<GeoIpQuery>,
) -> AppResult<Json<ApiResponse<GeoRecord>>> {
    let candidate = client_ip(
        query.ip.as_deref(),
        &headers,
        state.config.trusted_ip_header.as_ref(),
        addr.ip(),
    );

    let record = lookup_geoip(state.settings.as_ref(), state.geo.as_ref(), &candidate).await?;
    Ok(ApiResponse::ok(record))
}

/// Gate on the `geoip_enabled` setting, validate `candidate`, then resolve it.
/// The resolver is never reached when the gate is closed or the address is
/// malformed.
pub async fn lookup_geoip(
    settings: &dyn ConfigStore,
    resolver: &dyn GeoResolver,
    candidate: &str,
) -> AppResult<GeoRecord> {
    let settings = settings
        .settings()
        .await
        .map_err(|e| AppError::upstream("Failed to get configuration", e))?;

    if !settings.geoip_enabled {
        return Err(AppError::validation(
            "GeoIP is not enabled in the configuration",
        ));
    }

    let ip: IpAddr = candidate
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid IP address: {candidate}")))?;

    resolver.resolve(ip).await.map_err(|e| {
        tracing::warn!(%ip, error = %e, "GeoIP self-test lookup failed");
        AppError::upstream("Failed to get GeoIP record", e)
    })
}

/// Pick the address to geolocate: the explicit `ip` parameter, then the
/// trusted proxy header (first entry if it is a list), then the peer address.
pub fn client_ip(
    param: Option<&str>,
    headers: &HeaderMap,
    trusted_header: Option<&HeaderName>,
    peer: IpAddr,
) -> String {
    if let Some(ip) = param.map(str::trim).filter(|s| !s.is_empty()) {
        return ip.to_owned();
    }

    if let Some(name) = trusted_header {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if let Some(ip) = value.split(',').next().map(str::trim) {
                if !ip.is_empty() {
                    return ip.to_owned();
                }
            }
        }
    }

    peer.to_string()
}
