use anyhow::{Context, Result};

/// Server configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_db_connections: u32,
    pub bind_addr: String,
    /// Base URL the OAuth providers redirect back to.
    pub public_url: String,
    pub client_secret_path: String,
    pub session_inactivity_minutes: i64,
    pub feed_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();

        Ok(Self {
            database_url: dotenv::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            max_db_connections: dotenv::var("MAX_DB_CONNECTIONS")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("MAX_DB_CONNECTIONS must be a number")?,
            bind_addr: dotenv::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            public_url: dotenv::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            client_secret_path: dotenv::var("CLIENT_SECRET_PATH")
                .unwrap_or_else(|_| "client_secret.json".to_string()),
            session_inactivity_minutes: dotenv::var("SESSION_INACTIVITY_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("SESSION_INACTIVITY_MINUTES must be a number")?,
            feed_capacity: dotenv::var("FEED_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .context("FEED_CAPACITY must be a number")?,
        })
    }
}
