use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use car_rental::config::AppConfig;
use car_rental::db;
use car_rental::router::build_router;
use car_rental::services::notifications::webhook::WebhookNotifier;
use car_rental::services::notifications::{LogNotifier, NotificationProvider};
use car_rental::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        config.default_min_days >= 1 && config.default_min_days <= config.default_max_days,
        "DEFAULT_MIN_DAYS must be at least 1 and not exceed DEFAULT_MAX_DAYS"
    );
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set, using the insecure default");
    }

    let conn = db::init_db(&config.database_url)?;

    let notifier: Arc<dyn NotificationProvider> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("delivering notifications to {url}");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let (events_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
        events_tx,
    });

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
