//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::Config;
use cad_client::{CadSplitter, HttpCadSplitter, RetryPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{HttpMailer, InMemoryMailer, Mailer, NotificationDispatcher};
use record_store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    match &config.email {
        Some(email) => {
            tracing::info!(endpoint = %email.api_url, "using HTTP mailer");
            Arc::new(
                HttpMailer::new(&email.api_url, &email.api_key, &email.from)
                    .expect("failed to build HTTP mailer"),
            )
        }
        None => {
            tracing::warn!("EMAIL_API_URL not set, notifications are kept in memory");
            Arc::new(InMemoryMailer::new())
        }
    }
}

async fn serve<S: RecordStore + Clone + 'static>(
    store: S,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    // Background outbox dispatch
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = NotificationDispatcher::new(store.clone(), build_mailer(&config));
    let dispatch_task = tokio::spawn(dispatcher.run(config.notify_poll_interval, shutdown_rx));

    let policy = RetryPolicy::new(config.cad.max_attempts, config.cad.backoff_base);
    let cad: Arc<dyn CadSplitter> = Arc::new(
        HttpCadSplitter::new(&config.cad.base_url, config.cad.timeout, policy)
            .expect("failed to build CAD client"),
    );

    let state = Arc::new(AppState::new(store, cad));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatch_task.await {
        tracing::error!(error = %e, "notification dispatcher panicked");
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the record store and serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::PgPool::connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresRecordStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL record store");
            serve(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory record store");
            serve(InMemoryRecordStore::new(), config, metrics_handle).await;
        }
    }
}
