//! Application state

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::config::Config;
use crate::payos::PayOsClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Embedded migrations, also used by integration tests
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Payment gateway client
    pub payos: PayOsClient,
    /// Storefront base URL (checkout redirect target)
    pub web_url: String,
}

impl AppState {
    /// Create a new AppState: open the pool (WAL mode, foreign keys on) and
    /// run migrations.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // busy_timeout: wait up to 5s on write contention instead of failing
        sqlx::query("PRAGMA busy_timeout = 5000;").execute(&pool).await?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");

        let payos = PayOsClient::new(
            config.payos_client_id.clone(),
            config.payos_api_key.clone(),
            config.payos_checksum_key.clone(),
            config.payos_api_base.clone(),
        );

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            payos,
            web_url: config.web_url.clone(),
        })
    }
}
