//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Workers share one `SqliteStorage`; it keeps a small pool of connections so
//! that inserts from different workers do not queue on a single handle.

use crate::adapter::ArchiveId;
use crate::crawler::CrawlWindow;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, ImageRef};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite storage backend
pub struct SqliteStorage {
    pool: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` with `pool_size` connections
    pub fn open(path: &Path, pool_size: usize) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut pool = Vec::with_capacity(pool_size.max(1));
        for _ in 0..pool_size.max(1) {
            let conn = Connection::open(path)?;
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
            ",
            )?;
            pool.push(Mutex::new(conn));
        }

        let storage = Self {
            pool,
            next: AtomicUsize::new(0),
        };
        storage.create_table()?;
        Ok(storage)
    }

    /// Creates an in-memory database
    ///
    /// In-memory databases are private to their connection, so the pool
    /// holds exactly one.
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            pool: vec![Mutex::new(conn)],
            next: AtomicUsize::new(0),
        })
    }

    /// Number of pooled connections
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Picks a free connection, falling back to waiting on the next one in
    /// round-robin order
    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        let start = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();

        for offset in 0..self.pool.len() {
            let slot = &self.pool[(start + offset) % self.pool.len()];
            if let Ok(guard) = slot.try_lock() {
                return Ok(guard);
            }
        }

        // A poisoned connection is still usable; the panic happened in
        // another worker mid-statement and SQLite rolled it back.
        Ok(self.pool[start]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> StorageResult<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::Serialization(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn parse_date(raw: &str) -> StorageResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StorageError::Serialization(format!("bad stored date '{}': {}", raw, e)))
}

impl Storage for SqliteStorage {
    fn create_table(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        initialize_schema(&conn)?;
        Ok(())
    }

    fn insert_batch(&self, records: &[ArticleRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO sections
                 (date, archive, title, content, tag, image_path, image_blob, link, embedding, collected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for record in records {
                let (image_path, image_blob) = match &record.image {
                    Some(ImageRef::Stored(path)) => (Some(path.to_string_lossy().into_owned()), None),
                    Some(ImageRef::Inline(bytes)) => (None, Some(bytes.as_slice())),
                    None => (None, None),
                };
                let embedding = record.embedding.as_deref().map(encode_embedding);

                inserted += stmt.execute(params![
                    record.date.format(DATE_FORMAT).to_string(),
                    record.archive.as_str(),
                    record.title,
                    record.content,
                    record.tag,
                    image_path,
                    image_blob,
                    record.link,
                    embedding,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn get_done_links(
        &self,
        archive: &ArchiveId,
        window: &CrawlWindow,
    ) -> StorageResult<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT link FROM sections WHERE archive = ?1 AND date >= ?2 AND date <= ?3",
        )?;

        let links = stmt
            .query_map(
                params![
                    archive.as_str(),
                    window.begin.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string()
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(links)
    }

    fn get_done_dates(
        &self,
        archive: &ArchiveId,
        window: &CrawlWindow,
    ) -> StorageResult<HashSet<NaiveDate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT date FROM sections WHERE archive = ?1 AND date >= ?2 AND date <= ?3",
        )?;

        let raw = stmt
            .query_map(
                params![
                    archive.as_str(),
                    window.begin.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string()
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        raw.iter().map(|date| parse_date(date)).collect()
    }

    fn count_archive(&self, archive: &ArchiveId) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sections WHERE archive = ?1",
            params![archive.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_record(&self, link: &str) -> StorageResult<Option<ArticleRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT date, archive, title, content, tag, image_path, image_blob, link, embedding
                 FROM sections WHERE link = ?1",
                params![link],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<Vec<u8>>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, Option<Vec<u8>>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((date, archive, title, content, tag, image_path, image_blob, link, embedding)) =
            row
        else {
            return Ok(None);
        };

        let image = match (image_path, image_blob) {
            (Some(path), _) => Some(ImageRef::Stored(PathBuf::from(path))),
            (None, Some(bytes)) => Some(ImageRef::Inline(bytes)),
            (None, None) => None,
        };

        Ok(Some(ArticleRecord {
            date: parse_date(&date)?,
            archive: ArchiveId::new(archive),
            title,
            content,
            tag,
            image,
            link,
            embedding: embedding.as_deref().map(decode_embedding).transpose()?,
        }))
    }
}
