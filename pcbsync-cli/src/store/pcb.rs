//! Repository for the E_SOP_PCB_Table target table
//!
//! The table pre-exists; this layer only checks existence and writes
//! single rows. Every write runs inside its own transaction: commit on
//! success, rollback and re-raise on failure. All inputs are bound as
//! parameters, never concatenated into SQL.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub struct PcbStore {
    pool: SqlitePool,
}

impl PcbStore {
    /// Connect to the database holding E_SOP_PCB_Table
    ///
    /// The job is strictly sequential, so a single connection is enough.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to connect to database {}", database_url))?;
        Ok(Self { pool })
    }

    /// Wrap an already-connected pool
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// True iff a row with this exact (Eng_SR, PCB_item) pair exists
    pub async fn exists(&self, eng_sr: &str, pcb_item: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM E_SOP_PCB_Table WHERE Eng_SR = ? AND PCB_item = ?")
                .bind(eng_sr)
                .bind(pcb_item)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to check record existence")?;

        Ok(row.is_some())
    }

    /// True iff any row carries this serial, whatever its item
    pub async fn serial_exists(&self, eng_sr: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM E_SOP_PCB_Table WHERE Eng_SR = ?")
                .bind(eng_sr)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to check serial existence")?;

        Ok(row.is_some())
    }

    /// Append a new (Eng_SR, PCB_item) row
    pub async fn insert(&self, eng_sr: &str, pcb_item: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start transaction")?;

        let result = sqlx::query("INSERT INTO E_SOP_PCB_Table (Eng_SR, PCB_item) VALUES (?, ?)")
            .bind(eng_sr)
            .bind(pcb_item)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => tx.commit().await.context("Failed to commit insert"),
            Err(e) => {
                log::error!("insert failed for Eng_SR={}, PCB_item={}: {}", eng_sr, pcb_item, e);
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("rollback after failed insert also failed: {}", rollback_err);
                }
                Err(e).context("Failed to insert record")
            }
        }
    }

    /// Set PCB_item for every row matching this serial; returns the
    /// number of rows rewritten
    ///
    /// The predicate is the serial alone: duplicate serials all receive
    /// the incoming item, last writer wins.
    pub async fn update(&self, eng_sr: &str, pcb_item: &str) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start transaction")?;

        let result = sqlx::query("UPDATE E_SOP_PCB_Table SET PCB_item = ? WHERE Eng_SR = ?")
            .bind(pcb_item)
            .bind(eng_sr)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(done) => {
                tx.commit().await.context("Failed to commit update")?;
                Ok(done.rows_affected())
            }
            Err(e) => {
                log::error!("update failed for Eng_SR={}, PCB_item={}: {}", eng_sr, pcb_item, e);
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("rollback after failed update also failed: {}", rollback_err);
                }
                Err(e).context("Failed to update record")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool")
    }

    async fn test_store() -> PcbStore {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE E_SOP_PCB_Table (Eng_SR TEXT NOT NULL, PCB_item TEXT NOT NULL)")
            .execute(&pool)
            .await
            .expect("create table");
        PcbStore::with_pool(pool)
    }

    async fn all_rows(store: &PcbStore) -> Vec<(String, String)> {
        sqlx::query_as("SELECT Eng_SR, PCB_item FROM E_SOP_PCB_Table ORDER BY Eng_SR, PCB_item")
            .fetch_all(&store.pool)
            .await
            .expect("select all")
    }

    #[tokio::test]
    async fn insert_then_exists() {
        let store = test_store().await;
        assert!(!store.exists("SR1", "PN-100").await.unwrap());

        store.insert("SR1", "PN-100").await.unwrap();
        assert!(store.exists("SR1", "PN-100").await.unwrap());
        assert_eq!(all_rows(&store).await, vec![("SR1".into(), "PN-100".into())]);
    }

    #[tokio::test]
    async fn exists_requires_the_exact_pair() {
        let store = test_store().await;
        store.insert("SR1", "PN-100").await.unwrap();

        assert!(!store.exists("SR1", "PN-200").await.unwrap());
        assert!(!store.exists("SR2", "PN-100").await.unwrap());
        assert!(store.serial_exists("SR1").await.unwrap());
        assert!(!store.serial_exists("SR2").await.unwrap());
    }

    #[tokio::test]
    async fn update_rewrites_every_row_sharing_the_serial() {
        let store = test_store().await;
        store.insert("SR9", "PN-1").await.unwrap();
        store.insert("SR9", "PN-2").await.unwrap();
        store.insert("SR2", "PN-3").await.unwrap();

        let rows = store.update("SR9", "PN-7").await.unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            all_rows(&store).await,
            vec![
                ("SR2".into(), "PN-3".into()),
                ("SR9".into(), "PN-7".into()),
                ("SR9".into(), "PN-7".into()),
            ]
        );
    }

    #[tokio::test]
    async fn update_without_match_touches_nothing() {
        let store = test_store().await;
        store.insert("SR1", "PN-100").await.unwrap();

        let rows = store.update("SR2", "PN-200").await.unwrap();
        assert_eq!(rows, 0);
        assert_eq!(all_rows(&store).await, vec![("SR1".into(), "PN-100".into())]);
    }

    #[tokio::test]
    async fn write_against_a_missing_table_errors() {
        // No table created: the insert fails and the error propagates.
        let store = PcbStore::with_pool(memory_pool().await);
        assert!(store.insert("SR1", "PN-100").await.is_err());
        assert!(store.update("SR1", "PN-100").await.is_err());
    }
}
