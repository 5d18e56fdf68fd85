use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use profile_service::config::Config;
use profile_service::db::PgUserRepository;
use profile_service::services::ProfilePictureService;
use profile_service::storage::{ObjectStoreClient, S3ObjectStore};
use profile_service::{router, AppState};
use shared::observability::{init_logging, LogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (also reads .env)
    let config = Config::load()?;

    init_logging(LogConfig {
        level: config.logging.level,
        format: config.logging.format,
        service_name: "profile-service".to_string(),
        ..LogConfig::default()
    })?;

    info!("Starting Profile Service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database connection pool
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        info!("Database migrations completed");
    }

    // Initialize object storage
    let store = S3ObjectStore::connect(&config.storage).await;
    let storage = Arc::new(ObjectStoreClient::new(
        Arc::new(store),
        config.storage.clone(),
    ));

    if config.storage.ensure_bucket_on_startup {
        storage
            .ensure_bucket(storage.default_bucket())
            .await
            .context("Failed to prepare default bucket")?;
        info!("Default bucket {} is ready", storage.default_bucket());
    }

    let users = Arc::new(PgUserRepository::new(db_pool));
    let profile_pictures = Arc::new(ProfilePictureService::new(users, storage));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(Arc::new(AppState {
        config,
        profile_pictures,
    }));

    info!("Profile Service listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Profile Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = until_signal("Ctrl+C", signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

/// Resolve when `signal` fires. A handler that cannot be installed never
/// resolves, so it cannot trigger a shutdown.
async fn until_signal<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}
