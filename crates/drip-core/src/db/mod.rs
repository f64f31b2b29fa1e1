//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Stored ledger rows and range fetches
//! - `candidates` - Candidate persistence and the review workflow

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod candidates;
mod transactions;

#[cfg(test)]
mod tests;

pub use candidates::{CandidateUpdate, ManualCandidate};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations on open
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        info!(path, "Database opened");
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("drip_test_{}_{}.db", std::process::id(), id));
        let path = path.to_string_lossy().to_string();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Stored ledger rows; the detector reads these back as raw input
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                external_id TEXT,
                date TEXT,
                amount REAL NOT NULL,
                direction TEXT NOT NULL DEFAULT 'expense',
                merchant TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                category TEXT,
                import_hash TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_direction ON transactions(direction);

            -- Detected subscription candidates awaiting review
            CREATE TABLE IF NOT EXISTS subscription_candidates (
                id INTEGER PRIMARY KEY,
                merchant_key TEXT NOT NULL,
                merchant TEXT NOT NULL,
                category_id TEXT,
                estimated_monthly_amount REAL NOT NULL,
                frequency TEXT NOT NULL,
                first_detected_date TEXT,
                last_charge_date TEXT,
                next_expected_date TEXT,
                confidence_score REAL NOT NULL,
                occurrence_count INTEGER NOT NULL,
                average_amount REAL NOT NULL DEFAULT 0,
                variance_percentage REAL NOT NULL DEFAULT 0,
                recurrence_score REAL NOT NULL DEFAULT 0,
                amount_consistency_score REAL NOT NULL DEFAULT 0,
                keyword_score REAL NOT NULL DEFAULT 0,
                category_score REAL NOT NULL DEFAULT 0,
                detection_method TEXT NOT NULL,
                pattern_type TEXT NOT NULL DEFAULT '',
                reason TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_candidates_status ON subscription_candidates(status);

            -- Join table: which transactions contributed to a candidate
            CREATE TABLE IF NOT EXISTS candidate_transactions (
                candidate_id INTEGER NOT NULL REFERENCES subscription_candidates(id) ON DELETE CASCADE,
                transaction_id TEXT NOT NULL,
                PRIMARY KEY (candidate_id, transaction_id)
            );
            "#,
        )?;

        Ok(())
    }
}
