use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod response;
pub mod store;

use geo::GeoResolver;
use notify::NotificationChannel;
use store::{ConfigStore, RecordStore};

// ── Shared application state ───────────────────────────────────────────────

/// Everything a handler can reach. External integrations sit behind trait
/// objects so they can be swapped without touching handler code.
pub struct AppState {
    pub config: config::AppConfig,
    pub records: Arc<dyn RecordStore>,
    pub settings: Arc<dyn ConfigStore>,
    pub notifier: Arc<dyn NotificationChannel>,
    pub geo: Arc<dyn GeoResolver>,
}

// ── Router ─────────────────────────────────────────────────────────────────

/// Build the full application router. The caller must serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`; the GeoIP self-test
/// needs the peer address.
pub fn router(state: Arc<AppState>) -> Router {
    let admin_router = Router::new()
        .route("/records", get(handlers::records::get_records))
        .route(
            "/test/notification",
            post(handlers::selftest::test_notification),
        )
        .route("/test/geoip", get(handlers::selftest::test_geoip));

    Router::new()
        // Health check, returns 200 OK with no body
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api/admin", admin_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
