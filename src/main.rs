use anyhow::{Context, Result};
use clap::Parser;
use playlist_archiver::config::{self, Config};
use playlist_archiver::fetcher::YtDlpFetcher;
use playlist_archiver::ledger::Ledger;
use playlist_archiver::models::PlaylistEntry;
use playlist_archiver::pipeline::Pipeline;
use playlist_archiver::playlist::read_playlist;
use playlist_archiver::progress::{self, format_summary, RunProgress};
use playlist_archiver::runner::PlaylistRunner;
use playlist_archiver::safety::validate_layout;
use playlist_archiver::tagger::LoftyTagWriter;
use playlist_archiver::transcoder::FfmpegTranscoder;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "playlist-archiver")]
#[command(about = "Download, convert and tag every track of a playlist export, skipping tracks already archived")]
struct Args {
    /// Playlist export (CSV)
    #[arg(long, env = "PLAYLIST_CSV", default_value = config::DEFAULT_INPUT_PATH)]
    input: PathBuf,

    /// SQLite ledger of processed tracks
    #[arg(long, env = "PLAYLIST_DB", default_value = config::DEFAULT_STORE_PATH)]
    db: PathBuf,

    /// Directory for converted audio files
    #[arg(long, env = "PLAYLIST_OUTPUT_DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(long, env = "YT_DLP_PATH", default_value = config::DEFAULT_YT_DLP)]
    yt_dlp: PathBuf,

    #[arg(long, env = "FFMPEG_PATH", default_value = config::DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,

    /// Pause after each entry, in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_PAUSE_MS)]
    delay_ms: u64,

    /// List entries that would be downloaded, without downloading
    #[arg(long)]
    dry_run: bool,

    /// Disable progress bars, print periodic log lines instead
    #[arg(long)]
    log_only: bool,
}

impl Args {
    fn into_config(self) -> (Config, bool) {
        let config = Config {
            store_path: self.db,
            input_path: self.input,
            output_dir: self.output_dir,
            yt_dlp_path: self.yt_dlp,
            ffmpeg_path: self.ffmpeg,
            pause_between: Duration::from_millis(self.delay_ms),
            log_only: self.log_only,
        };
        (config, self.dry_run)
    }
}

fn pipeline(config: &Config) -> Pipeline<YtDlpFetcher, FfmpegTranscoder, LoftyTagWriter> {
    Pipeline::new(
        YtDlpFetcher::new(&config.yt_dlp_path),
        FfmpegTranscoder::new(&config.ffmpeg_path),
        LoftyTagWriter,
        &config.output_dir,
    )
}

/// Dry run: list entries the ledger does not cover. Never creates the ledger;
/// a missing one covers nothing.
fn report_pending(config: &Config, entries: &[PlaylistEntry]) -> Result<()> {
    let pending = if config.store_path.exists() {
        let ledger = Ledger::open_read_only(&config.store_path).context("Ledger unavailable")?;
        PlaylistRunner::new(ledger, pipeline(config)).pending(entries)?
    } else {
        println!("No ledger at {:?} yet", config.store_path);
        entries.iter().collect()
    };

    println!("\n{} of {} entries would be downloaded:", pending.len(), entries.len());
    for entry in &pending {
        println!("  {}", entry.label());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (config, dry_run) = Args::parse().into_config();
    progress::set_log_only(config.log_only);
    validate_layout(&config)?;

    let start = Instant::now();

    println!("Reading playlist: {:?}", config.input_path);
    let entries = read_playlist(&config.input_path)?;
    println!("Found {} entries", entries.len());

    if dry_run {
        return report_pending(&config, &entries);
    }

    println!("Opening ledger: {:?}", config.store_path);
    let ledger = Ledger::open(&config.store_path).context("Ledger unavailable")?;
    let runner = PlaylistRunner::new(ledger, pipeline(&config)).with_pause(config.pause_between);

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;

    println!("\nProcessing playlist...\n");
    let progress = RunProgress::new(entries.len());
    let summary = runner.run(&entries, &progress)?;

    println!("\n{}\n", format_summary(&summary, start.elapsed()));
    println!("Done.");

    Ok(())
}
