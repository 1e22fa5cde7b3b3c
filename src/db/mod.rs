// src/db/mod.rs
//
// Database layer: pooling, schema, integrity.

pub mod connection;
pub mod migrations;

pub use connection::{create_connection_pool, default_database_path, ConnectionPool, PooledConn};
pub use migrations::{initialize_database, verify_database_integrity};

#[cfg(test)]
pub use connection::create_test_pool;
