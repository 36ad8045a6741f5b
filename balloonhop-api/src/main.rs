use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use balloonhop_api::{app, AppState};
use balloonhop_core::payment::PaymentGateway;
use balloonhop_store::app_config::Config;
use balloonhop_store::{
    DbClient, DevGateway, LogNotifier, MemoryRateLimiter, MemoryStore, RateLimiter, RedisClient, Repositories,
    StripeGateway,
};

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to read .env: {}", err);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "balloonhop_api=debug,balloonhop_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!("Startup failed: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting BalloonHop API on port {} ({:?})",
        config.server.port,
        config.server.environment
    );

    let repos = if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; data is lost on restart");
        Repositories::memory(Arc::new(MemoryStore::new()))
    } else {
        let db = DbClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        Repositories::postgres(db.pool.clone())
    };

    let rate_limiter: Arc<dyn RateLimiter> = match config.redis.url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => Arc::new(RedisClient::new(url).await.context("Failed to connect to Redis")?),
        None => {
            tracing::info!("No Redis configured, rate limits are per process");
            Arc::new(MemoryRateLimiter::new())
        }
    };

    let payments: Arc<dyn PaymentGateway> = match config.stripe.secret_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let http_client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()
                .context("Failed to build HTTP client")?;
            Arc::new(StripeGateway::new(http_client, key, config.stripe.api_base.clone()))
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using the development payment gateway");
            Arc::new(DevGateway)
        }
    };

    let notifier = Arc::new(LogNotifier::new(config.twilio.is_configured()));

    let state = AppState::new(&config, repos, payments, notifier, rate_limiter)
        .context("Failed to register metrics")?;
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;
    Ok(())
}
