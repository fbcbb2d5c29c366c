use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crowdfund_api::background::project_finisher;
use crowdfund_api::config::ServerConfig;
use crowdfund_api::router::build_app_router;
use crowdfund_api::state::AppState;
use crowdfund_events::{
    EmailConfig, EmailDelivery, EventBus, Mailer, NotificationDispatcher, NotificationRetrier,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crowdfund_api=debug,crowdfund_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crowdfund_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crowdfund_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    crowdfund_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    tracing::info!("Event bus created");

    // --- Notification dispatcher ---
    let mailer: Option<Arc<dyn Mailer>> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(smtp_host = %email_config.smtp_host, "Email delivery enabled");
            Some(Arc::new(EmailDelivery::new(email_config)))
        }
        None => {
            tracing::info!("SMTP_HOST not set, owner notifications are recorded in-app only");
            None
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(pool.clone(), mailer));

    let dispatcher_handle = {
        let dispatcher = Arc::clone(&dispatcher);
        let receiver = event_bus.subscribe();
        tokio::spawn(async move { dispatcher.run(receiver).await })
    };

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let retrier = NotificationRetrier::new(
        Arc::clone(&dispatcher),
        Duration::from_secs(config.notification_retry_interval_secs),
    );
    let retrier_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { retrier.run(cancel).await })
    };

    let state = AppState::new(pool.clone(), config.clone(), Arc::clone(&event_bus));

    let finisher_handle = tokio::spawn(project_finisher::run(
        pool,
        state.notifier.clone(),
        Duration::from_secs(config.project_finish_interval_secs),
        cancel.clone(),
    ));

    tracing::info!("Background services started (notification dispatcher, retrier, project finisher)");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let task_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    let _ = tokio::time::timeout(task_timeout, finisher_handle).await;
    let _ = tokio::time::timeout(task_timeout, retrier_handle).await;
    tracing::info!("Project finisher and notification retrier stopped");

    // Dropping the last bus sender closes the channel, which ends the
    // dispatcher once it has drained pending requests.
    drop(event_bus);
    let _ = tokio::time::timeout(task_timeout, dispatcher_handle).await;
    tracing::info!("Notification dispatcher shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
