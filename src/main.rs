use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use reqwest::Client;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use waitlist_backend::config::{Config, StorageBackend};
use waitlist_backend::db::{
    event_log_repository::EventLogRepository,
    memory_repository::{InMemoryEventLog, InMemorySignupRepository},
    postgres_event_log_repository::PostgresEventLogRepository,
    postgres_signup_repository::PostgresSignupRepository,
    signup_repository::SignupRepository,
};
use waitlist_backend::responses::JsonResponse;
use waitlist_backend::services::pluggable_mailer::PluggableMailer;
use waitlist_backend::services::smtp_mailer::Mailer;
use waitlist_backend::{routes, worker, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env().context("invalid configuration")?);
    init_tracing();

    let (signups, events): (Arc<dyn SignupRepository>, Arc<dyn EventLogRepository>) =
        match config.storage_backend {
            StorageBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pool = establish_connection(database_url).await?;
                (
                    Arc::new(PostgresSignupRepository { pool: pool.clone() }),
                    Arc::new(PostgresEventLogRepository { pool }),
                )
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; signups are lost on restart");
                (
                    Arc::new(InMemorySignupRepository::new()),
                    Arc::new(InMemoryEventLog::new()),
                )
            }
        };

    let http_client = Client::new();
    let mailer = PluggableMailer::from_env(&http_client).context("failed to initialize mailer")?;
    info!(provider = mailer.provider_name(), "mailer ready");
    let mailer: Arc<dyn Mailer> = Arc::new(mailer);

    let state = AppState::new(signups, events, mailer, config.clone());
    worker::start_background_workers(state.clone()).await;

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit_ms)
            .burst_size(config.rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    // Evict idle client IPs from the limiter.
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "waitlist backend listening");
    axum::serve(listener, make_service).await?;
    Ok(())
}

/// Connects, verifies the connection and applies pending migrations.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    info!("connected to the database");
    Ok(pool)
}
