//! Run configuration.
//!
//! Defaults match the historical fixed layout (`data/` for the ledger and
//! playlist, `music/` for audio). Every field can be overridden from the CLI.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "data/spotify_downloads.db";
pub const DEFAULT_INPUT_PATH: &str = "data/playlist.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "music/";
pub const DEFAULT_YT_DLP: &str = "yt-dlp";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_PAUSE_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite file holding the completion ledger
    pub store_path: PathBuf,
    /// Playlist export (CSV)
    pub input_path: PathBuf,
    /// Directory receiving the final audio files
    pub output_dir: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    /// Pause after every entry, skipped or not
    pub pause_between: Duration,
    /// Hide progress bars and print periodic log lines instead
    pub log_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            yt_dlp_path: PathBuf::from(DEFAULT_YT_DLP),
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG),
            pause_between: Duration::from_millis(DEFAULT_PAUSE_MS),
            log_only: false,
        }
    }
}
