//! Database schema definitions
//!
//! This module contains the SQL schema for the News-Harvest database.

/// SQL schema for the database
///
/// `link` is the identity of a record; re-inserting a known link is a no-op.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    archive TEXT NOT NULL,
    title TEXT,
    content TEXT,
    tag TEXT,
    image_path TEXT,
    image_blob BLOB,
    link TEXT NOT NULL UNIQUE,
    embedding BLOB,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sections_archive_date ON sections(archive, date);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
