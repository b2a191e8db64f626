//! Track retrieval.
//!
//! `TrackFetcher` is the seam between the pipeline and whatever locates and
//! downloads audio for a search query. The default implementation drives the
//! `yt-dlp` command line tool.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download failed: {0}")]
    Failed(String),

    #[error("fetcher reported no downloaded file")]
    NoOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate and download the best available audio for a query.
pub trait TrackFetcher {
    /// Download audio for `query` into a file whose name starts with
    /// `output_stem` (the extension is chosen by the source). `progress`
    /// receives fractions in [0, 1]. Returns the path of the downloaded file.
    fn fetch(
        &self,
        query: &str,
        output_stem: &Path,
        progress: &mut dyn FnMut(f32),
    ) -> Result<PathBuf, FetchError>;
}

const PROGRESS_PREFIX: &str = "PLDL_PROGRESS|";
const OUTPUT_PREFIX: &str = "PLDL_OUTPUT|";

/// `yt-dlp` backed fetcher. Takes the first search hit.
#[derive(Clone, Debug)]
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, query: &str, output_stem: &Path) -> Command {
        let template = format!("{}.%(ext)s", output_stem.display());
        let mut command = Command::new(&self.binary);
        command
            .arg("--format")
            .arg("bestaudio/best")
            .arg("--no-playlist")
            .arg("--newline")
            .arg("--no-warnings")
            .arg("--progress")
            .arg("--progress-template")
            .arg(format!("download:{}%(progress._percent_str)s", PROGRESS_PREFIX))
            // --print alone would imply --simulate
            .arg("--no-simulate")
            .arg("--print")
            .arg(format!("after_move:{}%(filepath)s", OUTPUT_PREFIX))
            .arg("--output")
            .arg(template)
            .arg(format!("ytsearch1:{}", query))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl TrackFetcher for YtDlpFetcher {
    fn fetch(
        &self,
        query: &str,
        output_stem: &Path,
        progress: &mut dyn FnMut(f32),
    ) -> Result<PathBuf, FetchError> {
        let mut child = self
            .command(query, output_stem)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let stderr = child.stderr.take();
        let stderr_handle = thread::spawn(move || stderr.map(last_line).unwrap_or_default());

        // stdout is decoded lossily; a read error still reaps the child so no
        // download outlives this call
        let mut downloaded: Option<PathBuf> = None;
        if let Some(stdout) = child.stdout.take() {
            for chunk in BufReader::new(stdout).split(b'\n') {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stderr_handle.join();
                        return Err(FetchError::Io(e));
                    }
                };
                let line = String::from_utf8_lossy(&bytes);
                if let Some(fraction) = parse_progress_line(&line) {
                    progress(fraction);
                } else if let Some(path) = line.trim().strip_prefix(OUTPUT_PREFIX) {
                    downloaded = Some(PathBuf::from(path));
                }
            }
        }

        let status = child.wait()?;
        let stderr_tail = stderr_handle.join().unwrap_or_default();
        if !status.success() {
            let detail = if stderr_tail.is_empty() {
                format!("yt-dlp exited with {}", status)
            } else {
                stderr_tail
            };
            return Err(FetchError::Failed(detail));
        }

        downloaded.ok_or(FetchError::NoOutput)
    }
}

/// Parse a progress line such as `PLDL_PROGRESS| 42.5%` into `0.425`.
pub fn parse_progress_line(line: &str) -> Option<f32> {
    let pct = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let value: f32 = pct.trim().trim_end_matches('%').trim().parse().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

fn last_line<R: Read>(reader: R) -> String {
    BufReader::new(reader)
        .split(b'\n')
        .map_while(Result::ok)
        .map(|l| String::from_utf8_lossy(&l).trim().to_string())
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default()
}
