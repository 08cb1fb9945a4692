use std::sync::Arc;
use std::time::Duration;

use alert_engine::consumer::{ConsumerHealth, QuoteFeedReader};
use alert_engine::db::{AlertStore, NotificationStore};
use alert_engine::delivery::{EmailSender, InAppSender, Router};
use alert_engine::health::{self, AppState};
use alert_engine::pipeline::Engine;
use alert_engine::{AppError, Config, Result};
use migration::MigratorTrait;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alert_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; missing required secrets are fatal here.
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!("Starting alert-engine");

    // Initialize database connection
    // Arc-shared: `DatabaseConnection` only implements `Clone` when
    // sea-orm's mock feature (enabled for tests) is off.
    let db = Arc::new(
        sea_orm::Database::connect(&config.database_url)
            .await
            .map_err(AppError::Database)?,
    );

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(db.as_ref(), None)
        .await
        .map_err(AppError::Database)?;

    tracing::info!("Migrations completed successfully");

    // Initialize stores and delivery adapters
    let alerts = AlertStore::new(db.clone());
    let notifications = NotificationStore::new(db.clone());

    let email = match &config.smtp {
        Some(smtp) => Some(Arc::new(EmailSender::new(
            smtp,
            config.frontend_url.clone(),
            config.email_max_retries,
            alerts.clone(),
        )?)),
        None => {
            tracing::warn!("SMTP not configured — email channel disabled");
            None
        }
    };
    let router = Router::new(
        notifications.clone(),
        InAppSender::new(notifications.clone()),
        email.clone(),
    );

    let engine = Arc::new(Engine::new(
        alerts,
        notifications,
        router,
        config.max_in_flight,
    ));

    // Start the queue consumer
    let consumer_health = Arc::new(ConsumerHealth::new());
    let reader = QuoteFeedReader::new(&config, engine, consumer_health.clone())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(reader.run(shutdown_rx));

    // Start the health server
    let app = health::router(AppState::new(
        db.clone(),
        consumer_health,
        email,
        config.canary_token.clone(),
    ));
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Health server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let server_task = tokio::spawn(async move { axum::serve(listener, app).await });

    // Graceful shutdown: stop pulling new batches, let the in-flight
    // batch finish within the timeout, leave unfinished work
    // uncommitted so it redelivers.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        consumer_task,
    )
    .await
    {
        Ok(_) => tracing::info!("Consumer drained"),
        Err(_) => tracing::warn!("Consumer did not stop within timeout — exiting anyway"),
    }

    server_task.abort();
    Ok(())
}
