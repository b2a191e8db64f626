//! Audio conversion to the archive format.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors that can occur during transcoding.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("input file missing: {0}")]
    MissingInput(PathBuf),

    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg failed ({status}): {detail}")]
    Failed { status: String, detail: String },

    #[error("transcoder produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed output parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub bitrate_kbps: u32,
}

/// 44.1 kHz, stereo, 192 kbps.
pub const ARCHIVE_SETTINGS: TranscodeSettings = TranscodeSettings {
    sample_rate_hz: 44_100,
    channels: 2,
    bitrate_kbps: 192,
};

/// Extension of every archived file.
pub const ARCHIVE_EXTENSION: &str = "mp3";

/// Blocking conversion of one file into another.
pub trait Transcoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
    ) -> Result<(), TranscodeError>;
}

/// `ffmpeg` backed transcoder. Waits for the process to exit; stdout is
/// discarded and stderr kept only for the error message.
#[derive(Clone, Debug)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
    ) -> Result<(), TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::MissingInput(input.to_path_buf()));
        }

        let mut child = Command::new(&self.binary)
            .arg("-y")
            .arg("-nostdin")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .args(["-ar", &settings.sample_rate_hz.to_string()])
            .args(["-ac", &settings.channels.to_string()])
            .args(["-b:a", &format!("{}k", settings.bitrate_kbps)])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        // stdout is null, so stderr is the only pipe and can be drained before wait
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr)?;
        }
        let status = child.wait()?;

        if !status.success() {
            let detail = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .unwrap_or("no diagnostic output")
                .to_string();
            return Err(TranscodeError::Failed {
                status: status.to_string(),
                detail,
            });
        }

        if !output.exists() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}
