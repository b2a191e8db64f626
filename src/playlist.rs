//! Playlist export ingestion.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

use crate::models::PlaylistEntry;

/// Header columns the export must carry. Order does not matter.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Track name", "Artist name", "ISRC", "Album", "Spotify - id"];

/// Read every entry of the playlist export at `path`, in file order.
pub fn read_playlist(path: &Path) -> Result<Vec<PlaylistEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open playlist {}", path.display()))?;
    read_entries(file).with_context(|| format!("Failed to read playlist {}", path.display()))
}

/// Parse playlist rows from any reader. Missing required columns are fatal
/// and reported together.
pub fn read_entries<R: Read>(reader: R) -> Result<Vec<PlaylistEntry>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers().context("Failed to read header row")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == *col))
        .collect();
    if !missing.is_empty() {
        bail!("Playlist is missing required column(s): {}", missing.join(", "));
    }

    let mut entries = Vec::new();
    for (i, row) in rdr.deserialize::<PlaylistEntry>().enumerate() {
        // header is line 1
        let entry = row.with_context(|| format!("Malformed playlist row at line {}", i + 2))?;
        entries.push(entry);
    }
    Ok(entries)
}
