use std::{net::SocketAddr, sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outpost::{config, db, geo::HttpGeoResolver, notify::TelegramChannel, router, AppState};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent, env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outpost=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Outpost on {}:{}", config.host, config.port);

    // Open SQLite pool and apply migrations; the pool is both the record
    // store and the settings store.
    let pool = db::connect(&config.database_url).await?;

    let geo = HttpGeoResolver::new(
        config.geoip_provider,
        Duration::from_secs(config.geoip_timeout_secs),
    )?;
    tracing::info!("GeoIP provider: {}", config.geoip_provider.name());

    let notifier = TelegramChannel::new(config.telegram.clone())?;
    if !notifier.is_configured() {
        tracing::warn!("Telegram credentials not set; test notifications will fail");
    }

    match &config.trusted_ip_header {
        Some(name) => tracing::info!("Trusting client IP header '{}'", name),
        None => tracing::info!("Client IP header trust disabled"),
    }

    let bind_addr = format!("{}:{}", config.host, config.port);

    let state = Arc::new(AppState {
        config,
        records: Arc::new(pool.clone()),
        settings: Arc::new(pool),
        notifier: Arc::new(notifier),
        geo: Arc::new(geo),
    });

    let app = router(state);

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
