// src/db/connection.rs
//
// Database connection management
//
// PRINCIPLES:
// - Explicit connection pooling
// - No hidden connection creation
// - Clear error propagation
// - Thread-safe access

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Default database file path: {DATA_DIR}/anibell/anibell.db
pub fn default_database_path() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::Other("Could not determine data directory".to_string()))?;

    let anibell_dir = data_dir.join("anibell");
    std::fs::create_dir_all(&anibell_dir)?;

    Ok(anibell_dir.join("anibell.db"))
}

/// Create a connection pool for the database at `db_path`.
///
/// Pool configuration:
/// - Max 15 connections
/// - SQLite in WAL mode for better concurrency (reads never block on writes)
/// - Foreign keys enabled
/// - Busy timeout set so concurrent engine writes wait instead of erroring
pub fn create_connection_pool(db_path: &Path) -> AppResult<ConnectionPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(15)
        .build(manager)
        .map_err(|e| AppError::Pool(format!("Failed to create connection pool: {}", e)))?;

    Ok(pool)
}

/// Create an in-memory pool for unit tests.
///
/// A single connection keeps the in-memory database alive and shared for
/// the pool's lifetime.
#[cfg(test)]
pub fn create_test_pool() -> ConnectionPool {
    let manager = SqliteConnectionManager::memory().with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    });

    Pool::builder().max_size(1).build(manager).expect("in-memory pool")
}
