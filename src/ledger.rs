//! Completion ledger backed by a single SQLite file.
//!
//! The `downloads` table is append-only: one row per processing attempt,
//! never updated or deleted. Only `success` rows satisfy later entries.
//! A connection is opened per operation, so every call is its own implicit
//! transaction and nothing is held open across a run.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{CompletionRecord, Outcome, PlaylistEntry, STATUS_SUCCESS};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    track_name TEXT,
    artist_name TEXT,
    album TEXT,
    isrc TEXT,
    spotify_id TEXT,
    status TEXT,
    downloaded_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Clone, Debug)]
pub struct Ledger {
    path: PathBuf,
    read_only: bool,
}

impl Ledger {
    /// Open the ledger at `path`, creating the file, its parent directory and
    /// the schema when missing. Safe to call against an existing ledger.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger directory {}", parent.display()))?;
        }
        let ledger = Self {
            path: path.to_path_buf(),
            read_only: false,
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Attach to an existing ledger without creating or writing anything.
    /// Appends through a read-only ledger fail.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("Ledger not found: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            read_only: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = if self.read_only {
            Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        } else {
            Connection::open(&self.path)
        };
        let conn = conn
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Idempotent schema creation.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA).context("Failed to create ledger schema")?;
        Ok(())
    }

    /// True when a prior successful attempt already covers `entry`, either by
    /// a shared non-empty ISRC or by normalized title and artist.
    ///
    /// The entry side is normalized; stored rows are only passed through
    /// SQLite's `LOWER()`. Rows whose raw text carries accents or punctuation
    /// therefore match only on ISRC.
    pub fn is_satisfied(&self, entry: &PlaylistEntry) -> Result<bool> {
        let conn = self.connect()?;
        let (title_norm, artist_norm) = entry.match_key();
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM downloads
                 WHERE status = ?1
                   AND ((isrc IS NOT NULL AND isrc != '' AND isrc = ?2)
                        OR (LOWER(track_name) = ?3 AND LOWER(artist_name) = ?4))
                 LIMIT 1",
                params![STATUS_SUCCESS, entry.isrc, title_norm, artist_norm],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query ledger")?;
        Ok(found.is_some())
    }

    /// Append one attempt for `entry`. Never checks for duplicates.
    /// Returns the new row id.
    pub fn record(&self, entry: &PlaylistEntry, outcome: &Outcome) -> Result<i64> {
        self.record_status(entry, &outcome.status())
    }

    pub fn record_status(&self, entry: &PlaylistEntry, status: &str) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO downloads (track_name, artist_name, album, isrc, spotify_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.title,
                entry.artist,
                entry.album,
                entry.isrc,
                entry.catalog_id,
                status,
            ],
        )
        .context("Failed to append to ledger")?;
        Ok(conn.last_insert_rowid())
    }

    /// Total number of rows.
    pub fn len(&self) -> Result<i64> {
        let conn = self.connect()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM downloads", [], |row| row.get(0))?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every row in insertion order.
    pub fn records(&self) -> Result<Vec<CompletionRecord>> {
        self.query_records("SELECT id, track_name, artist_name, album, isrc, spotify_id, status, downloaded_at
             FROM downloads ORDER BY id", params![])
    }

    /// Most recent failed attempts, newest first.
    pub fn recent_failures(&self, limit: usize) -> Result<Vec<CompletionRecord>> {
        self.query_records(
            "SELECT id, track_name, artist_name, album, isrc, spotify_id, status, downloaded_at
             FROM downloads WHERE status != 'success' ORDER BY id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    fn query_records<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<CompletionRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(CompletionRecord {
                id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                artist: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                album: row.get(3)?,
                isrc: row.get(4)?,
                catalog_id: row.get(5)?,
                status: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                recorded_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            })
        })?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}
