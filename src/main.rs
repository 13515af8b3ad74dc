use anyhow::{Context, Result};
use soulroom::{app, auth, db, feed::Feed, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,soulroom=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let db_pool = db::connect(&config.database_url, config.max_db_connections)
        .await
        .context("failed to open database")?;
    db::migrate(&db_pool).await.context("failed to run migrations")?;

    let client_secret = std::fs::read_to_string(&config.client_secret_path)
        .with_context(|| format!("failed to read {}", config.client_secret_path))?;
    let clients = auth::Clients::from_json(serde_json::from_str(&client_secret)?, &config.public_url)
        .map_err(|err| err.0)?;

    let app_state = AppState {
        db_pool,
        clients,
        feed: Feed::with_capacity(config.feed_capacity),
    };

    let app = app(app_state, time::Duration::minutes(config.session_inactivity_minutes));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
