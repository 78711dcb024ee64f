//! fanforge-rs server entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use fanforge_api::{AppState, auth_middleware, router as api_router};
use fanforge_common::Config;
use fanforge_core::{
    EmailNotifier, ImageStoreService, LocalImageStore, LogNotifier, NotifierService,
};
use fanforge_db::SeaOrmStore;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// `FANFORGE_LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fanforge=debug,tower_http=debug".into());
    let json = std::env::var("FANFORGE_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting fanforge-rs server...");

    let config = Config::load()?;

    let db = fanforge_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    fanforge_db::migrate(&db).await?;
    info!("Migrations completed");

    let notifier: NotifierService = if config.email.enabled {
        info!(host = %config.email.smtp_host, "Sending notifications by email");
        Arc::new(EmailNotifier::new(&config.email)?)
    } else {
        info!("Email disabled, notifications are only logged");
        Arc::new(LogNotifier)
    };
    let images: ImageStoreService = Arc::new(LocalImageStore::new(config.media.base_path.clone()));

    let store = Arc::new(SeaOrmStore::new(Arc::new(db)));
    let state = AppState::new(store, notifier, images);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
