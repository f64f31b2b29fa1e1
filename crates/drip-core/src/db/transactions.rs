//! Stored transaction operations

use chrono::NaiveDate;
use rusqlite::params;
use sha2::{Digest, Sha256};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Direction, NewStoredTransaction, StoredTransaction};

impl Database {
    /// Insert a transaction, deduplicating on its content hash.
    ///
    /// Returns `Some(id)` for a new row, `None` when an identical row
    /// (same date, amount, and description) is already stored.
    pub fn insert_transaction(&self, tx: &NewStoredTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let hash = import_hash(tx);

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO transactions
                (external_id, date, amount, direction, merchant, description, category, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.external_id,
                tx.date.map(|d| d.to_string()),
                tx.amount,
                tx.direction.as_str(),
                tx.merchant,
                tx.description,
                tx.category,
                hash,
            ],
        )?;

        if inserted == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }

    /// List stored transactions, newest first
    pub fn list_transactions(&self, limit: i64, offset: i64) -> Result<Vec<StoredTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, external_id, date, amount, direction, merchant, description, category, created_at
            FROM transactions
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit, offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch expense rows inside a date window, oldest first.
    ///
    /// This is what detection runs consume: income rows and rows without a
    /// parseable date are excluded here rather than by the engine.
    pub fn fetch_expenses_in_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<StoredTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, external_id, date, amount, direction, merchant, description, category, created_at
            FROM transactions
            WHERE direction = 'expense'
              AND date IS NOT NULL
              AND (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date <= ?2)
            ORDER BY date ASC, id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    start.map(|d| d.to_string()),
                    end.map(|d| d.to_string())
                ],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Resolve the id references a candidate carries back to stored rows.
    ///
    /// References may be source-system ids or stringified row ids; rows that
    /// no longer exist are silently omitted.
    pub fn find_transactions_by_refs(&self, refs: &[String]) -> Result<Vec<StoredTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, external_id, date, amount, direction, merchant, description, category, created_at
            FROM transactions
            WHERE external_id = ?1 OR CAST(id AS TEXT) = ?1
            "#,
        )?;

        let mut found = Vec::new();
        for reference in refs {
            let mut rows = stmt
                .query_map(params![reference], row_to_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            found.append(&mut rows);
        }
        Ok(found)
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTransaction> {
    let date_str: Option<String> = row.get(2)?;
    let direction_str: String = row.get(4)?;
    let created_at_str: String = row.get(8)?;

    Ok(StoredTransaction {
        id: row.get(0)?,
        external_id: row.get(1)?,
        date: date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        amount: row.get(3)?,
        direction: if direction_str == "income" {
            Direction::Income
        } else {
            Direction::Expense
        },
        merchant: row.get(5)?,
        description: row.get(6)?,
        category: row.get(7)?,
        created_at: parse_datetime(&created_at_str),
    })
}

/// Content hash for deduplication: same date, amount, and description
/// means the same charge
fn import_hash(tx: &NewStoredTransaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        tx.date
            .map(|d| d.to_string())
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(format!("{:.2}", tx.amount).as_bytes());
    hasher.update(b"|");
    hasher.update(tx.description.as_bytes());
    hasher.update(b"|");
    hasher.update(tx.merchant.as_bytes());
    hex::encode(hasher.finalize())
}
