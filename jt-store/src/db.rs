use std::time::Duration;

use anyhow::Result;
use log::LevelFilter;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Pool, Sqlite};

/// Connection string for the price database, e.g. `sqlite://data/trade.db`
/// or `sqlite::memory:`.
#[derive(Clone)]
pub struct SqliteConnectionString(pub String);

pub async fn get_sqlite_connection_pool(connection_string: SqliteConnectionString) -> Result<Pool<Sqlite>> {
    let database_connection_options: SqliteConnectOptions = connection_string
        .0
        .parse::<SqliteConnectOptions>()?
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(60));

    let sqlite_connection_pool: Pool<Sqlite> = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(database_connection_options)
        .await?;

    Ok(sqlite_connection_pool)
}

// A single connection keeps every query on the same :memory: database.
#[cfg(test)]
pub(crate) async fn in_memory_pool() -> Pool<Sqlite> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with("sqlite::memory:".parse::<SqliteConnectOptions>().expect("connect options"))
        .await
        .expect("in-memory pool")
}

/// Shared handle the Db-backed Bmcs read from.
#[derive(Debug, Clone)]
pub struct DbModelManager {
    pool: Pool<Sqlite>,
}

impl DbModelManager {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
