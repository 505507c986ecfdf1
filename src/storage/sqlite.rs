//! SQLite manifest implementation
//!
//! This module provides a SQLite-based implementation of the Manifest trait.

use crate::state::PageState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Manifest, StorageError, StorageResult};
use crate::storage::{PageEntry, PageRecord, RunRecord, RunStatus};
use crate::CloneError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const PAGE_COLUMNS: &str = "id, run_id, url, resolved_url, path, depth, sibling_index, state, \
     content_type, status_code, valid, error_message, recorded_at";

/// SQLite manifest backend
pub struct SqliteManifest {
    conn: Connection,
}

impl SqliteManifest {
    /// Opens or creates a manifest database at `path`
    pub fn new(path: &Path) -> Result<Self, CloneError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory manifest, discarded on drop
    pub fn open_in_memory() -> Result<Self, CloneError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        url: row.get(2)?,
        resolved_url: row.get(3)?,
        path: row.get(4)?,
        depth: row.get(5)?,
        sibling_index: row.get(6)?,
        state: PageState::from_db_string(&row.get::<_, String>(7)?).unwrap_or(PageState::Failed),
        content_type: row.get(8)?,
        status_code: row.get(9)?,
        valid: row.get(10)?,
        error_message: row.get(11)?,
        recorded_at: row.get(12)?,
    })
}

impl Manifest for SqliteManifest {
    // ===== Run Management =====

    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, seed_url, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, seed_url, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Records =====

    fn record_page(&mut self, run_id: i64, entry: &PageEntry) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pages (run_id, url, resolved_url, path, depth, sibling_index, state,
                content_type, status_code, valid, error_message, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run_id,
                entry.url,
                entry.resolved_url,
                entry.path,
                entry.depth,
                entry.sibling_index,
                entry.state.to_db_string(),
                entry.content_type,
                entry.status_code,
                entry.valid,
                entry.error_message,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE run_id = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;
        let pages = stmt
            .query_map(params![run_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn find_page_by_url(&self, run_id: i64, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages
                     WHERE run_id = ?1 AND state = ?2 AND (url = ?3 OR resolved_url = ?3)
                     ORDER BY id LIMIT 1",
                    PAGE_COLUMNS
                ),
                params![run_id, PageState::Stored.to_db_string(), url],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    // ===== Statistics =====

    fn count_pages_by_state(&self, run_id: i64, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1 AND state = ?2",
            params![run_id, state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_invalid_pages(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1 AND state = ?2 AND valid = 0",
            params![run_id, PageState::Stored.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_depth_breakdown(&self, run_id: i64) -> StorageResult<HashMap<u32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, COUNT(*) FROM pages WHERE run_id = ?1 AND state = ?2 GROUP BY depth",
        )?;
        let rows = stmt.query_map(params![run_id, PageState::Stored.to_db_string()], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut breakdown = HashMap::new();
        for row in rows {
            let (depth, count) = row?;
            breakdown.insert(depth, count);
        }
        Ok(breakdown)
    }

    fn get_failures(&self, run_id: i64) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, COALESCE(error_message, '') FROM pages
             WHERE run_id = ?1 AND state = ?2 ORDER BY id",
        )?;
        let failures = stmt
            .query_map(params![run_id, PageState::Failed.to_db_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(failures)
    }
}
