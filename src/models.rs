//! Core data models for playlist archiving.
//!
//! Playlist entries come from the export and are read-only; completion
//! records are what the ledger persists for every processing attempt.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_text;

// ============================================================================
// Playlist Models
// ============================================================================

/// One row of the playlist export.
///
/// Column names follow the export header exactly; extra columns are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PlaylistEntry {
    #[serde(rename = "Track name")]
    pub title: String,
    #[serde(rename = "Artist name")]
    pub artist: String,
    #[serde(rename = "Album")]
    pub album: String,
    #[serde(rename = "ISRC", deserialize_with = "empty_as_none")]
    pub isrc: Option<String>,
    #[serde(rename = "Spotify - id")]
    pub catalog_id: String,
}

impl PlaylistEntry {
    pub fn new(title: &str, artist: &str, album: &str, isrc: Option<&str>, catalog_id: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            isrc: isrc
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            catalog_id: catalog_id.to_string(),
        }
    }

    /// Normalized (title, artist) pair used for name-based dedup.
    pub fn match_key(&self) -> (String, String) {
        (normalize_text(&self.title), normalize_text(&self.artist))
    }

    /// Search query handed to the fetcher: raw text plus a fixed qualifier.
    pub fn search_query(&self) -> String {
        format!("{} {} audio", self.title, self.artist)
    }

    /// Deterministic file stem built from the raw title and artist.
    /// Path separators and NUL would escape or break the output directory.
    pub fn file_stem(&self) -> String {
        format!("{} - {}", self.title, self.artist)
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                other => other,
            })
            .collect()
    }

    /// Short label for progress output.
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

// ============================================================================
// Outcome Models
// ============================================================================

/// Classified result of running one entry through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    FetchFailed(String),
    TranscodeFailed(String),
    TagFailed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Status string persisted in the ledger: `success` or `error:<kind>: <detail>`.
    pub fn status(&self) -> String {
        match self {
            Outcome::Success => STATUS_SUCCESS.to_string(),
            Outcome::FetchFailed(detail) => format!("error:fetch_failed: {}", detail),
            Outcome::TranscodeFailed(detail) => format!("error:transcode_failed: {}", detail),
            Outcome::TagFailed(detail) => format!("error:tag_failed: {}", detail),
        }
    }
}

/// Ledger status for a completed download. Only rows with this status count for dedup.
pub const STATUS_SUCCESS: &str = "success";

/// Prefix shared by every failure status.
pub const STATUS_ERROR_PREFIX: &str = "error:";

/// Error kind of a stored status, e.g. `transcode_failed` for
/// `error:transcode_failed: exit status 1`. Rows written by older runs carry
/// `error: <message>` and map to `unclassified`.
pub fn error_kind(status: &str) -> Option<&str> {
    let rest = status.strip_prefix(STATUS_ERROR_PREFIX)?;
    let kind = rest.split(':').next().unwrap_or("").trim();
    if kind.is_empty() || kind.contains(' ') {
        Some("unclassified")
    } else {
        Some(kind)
    }
}

// ============================================================================
// Ledger Models
// ============================================================================

/// A persisted processing attempt.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRecord {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub isrc: Option<String>,
    pub catalog_id: Option<String>,
    pub status: String,
    pub recorded_at: String,
}

// ============================================================================
// Run Statistics
// ============================================================================

/// Aggregate counters for one run over a playlist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub errored: usize,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(Outcome::Success.status(), "success");
        assert_eq!(
            Outcome::FetchFailed("no results".into()).status(),
            "error:fetch_failed: no results"
        );
        assert!(Outcome::TranscodeFailed("x".into()).status().starts_with(STATUS_ERROR_PREFIX));
        assert!(Outcome::TagFailed("x".into()).status().starts_with(STATUS_ERROR_PREFIX));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(error_kind("success"), None);
        assert_eq!(error_kind("error:fetch_failed: boom"), Some("fetch_failed"));
        assert_eq!(error_kind("error:transcode_failed: exit status 1"), Some("transcode_failed"));
        assert_eq!(error_kind("error: HTTP Error 403"), Some("unclassified"));
    }

    #[test]
    fn test_entry_helpers() {
        let entry = PlaylistEntry::new("Back In Black", "AC/DC", "Back In Black", Some(" "), "id1");
        assert_eq!(entry.isrc, None);
        assert_eq!(entry.file_stem(), "Back In Black - AC_DC");
        assert_eq!(entry.search_query(), "Back In Black AC/DC audio");
        assert_eq!(entry.match_key(), ("back in black".to_string(), "acdc".to_string()));
    }
}
