// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! conclave-storage: the single embedded SQL database the daemon owns.
//!
//! [`Db`] opens one SQLite file in WAL mode and hands out a connection
//! pool; [`registry`], [`context`], [`resources`], [`proposals`] and
//! [`documents`] are thin modules built directly on that pool rather than
//! separate crates — siblings over one shared connection pool instead of
//! one state store per concern.

pub mod context;
pub mod documents;
pub mod error;
mod migration;
pub mod proposals;
pub mod registry;
pub mod resources;

pub use error::{Result, StorageError};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Owns the single SQLite connection pool for the daemon process.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if absent) the database file at `path` in WAL mode
    /// and run migrations. Exclusive to the daemon process — workers only
    /// ever reach this through the HTTP/JSON-RPC surface.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        migration::migrate(&pool).await?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(Self { pool })
    }

    /// In-memory database, for tests that do not need a file on disk.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        migration::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
