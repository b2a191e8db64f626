//! Fetch → transcode → tag for one playlist entry.
//!
//! `Pipeline::process` never returns a raw error: every step failure is
//! folded into an `Outcome` so the runner can record it and move on.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::fetcher::{FetchError, TrackFetcher};
use crate::models::{Outcome, PlaylistEntry};
use crate::tagger::{TagError, TagWriter, TrackTags};
use crate::transcoder::{TranscodeError, TranscodeSettings, Transcoder, ARCHIVE_EXTENSION, ARCHIVE_SETTINGS};

pub struct Pipeline<F, T, W> {
    fetcher: F,
    transcoder: T,
    tagger: W,
    output_dir: PathBuf,
    settings: TranscodeSettings,
}

impl<F, T, W> Pipeline<F, T, W>
where
    F: TrackFetcher,
    T: Transcoder,
    W: TagWriter,
{
    pub fn new(fetcher: F, transcoder: T, tagger: W, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            transcoder,
            tagger,
            output_dir: output_dir.into(),
            settings: ARCHIVE_SETTINGS,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Final location of the archived file for `entry`.
    pub fn target_path(&self, entry: &PlaylistEntry) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", entry.file_stem(), ARCHIVE_EXTENSION))
    }

    /// Run one entry through the pipeline. `progress` receives fetch
    /// fractions in [0, 1] and is used for display only.
    pub fn process(&self, entry: &PlaylistEntry, progress: &mut dyn FnMut(f32)) -> Outcome {
        let target = self.target_path(entry);

        let fetched = match self.fetch(entry, progress) {
            Ok(path) => path,
            Err(e) => return Outcome::FetchFailed(e.to_string()),
        };

        if let Err(e) = self.transcode(&fetched, &target) {
            return Outcome::TranscodeFailed(e.to_string());
        }

        let tags = TrackTags {
            title: &entry.title,
            artist: &entry.artist,
            album: &entry.album,
        };
        if let Err(e) = self.tag(&target, &tags) {
            return Outcome::TagFailed(e.to_string());
        }

        Outcome::Success
    }

    fn fetch(&self, entry: &PlaylistEntry, progress: &mut dyn FnMut(f32)) -> Result<PathBuf, FetchError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let stem = self.output_dir.join(entry.file_stem());
        let query = entry.search_query();
        debug!(query = %query, "fetching");
        let fetched = self.fetcher.fetch(&query, &stem, progress)?;
        progress(1.0);
        Ok(fetched)
    }

    /// Convert `fetched` into `target`, then remove the intermediate file.
    fn transcode(&self, fetched: &Path, target: &Path) -> Result<(), TranscodeError> {
        if !fetched.exists() {
            return Err(TranscodeError::MissingInput(fetched.to_path_buf()));
        }

        // the source may already carry the archive extension; never transcode in place
        let input = if fetched == target {
            let aside = target.with_extension(format!("source.{}", ARCHIVE_EXTENSION));
            std::fs::rename(fetched, &aside)?;
            aside
        } else {
            fetched.to_path_buf()
        };

        if let Err(e) = self.transcoder.transcode(&input, target, &self.settings) {
            if input != fetched {
                warn!(path = %input.display(), "source left behind after failed conversion");
            }
            return Err(e);
        }

        if let Err(e) = std::fs::remove_file(&input) {
            warn!(path = %input.display(), error = %e, "failed to remove intermediate file");
        }
        Ok(())
    }

    fn tag(&self, target: &Path, tags: &TrackTags<'_>) -> Result<(), TagError> {
        self.tagger.write_tags(target, tags)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-process stand-ins for the external capabilities.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Writes a small file named after the stem, or fails for chosen queries.
    #[derive(Default)]
    pub struct FakeFetcher {
        pub extension: String,
        pub failing: HashSet<String>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self {
                extension: "webm".to_string(),
                ..Default::default()
            }
        }

        pub fn failing_on(mut self, query: &str) -> Self {
            self.failing.insert(query.to_string());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl TrackFetcher for FakeFetcher {
        fn fetch(
            &self,
            query: &str,
            output_stem: &Path,
            progress: &mut dyn FnMut(f32),
        ) -> Result<PathBuf, FetchError> {
            self.calls.borrow_mut().push(query.to_string());
            if self.failing.contains(query) {
                return Err(FetchError::Failed("ERROR: no results".to_string()));
            }
            progress(0.5);
            let path = PathBuf::from(format!("{}.{}", output_stem.display(), self.extension));
            std::fs::write(&path, b"source audio")?;
            Ok(path)
        }
    }

    impl<T, W> Pipeline<FakeFetcher, T, W> {
        pub fn fetcher_calls(&self) -> usize {
            self.fetcher.call_count()
        }
    }

    /// Copies input to output, or exits "non-zero" when told to.
    #[derive(Default)]
    pub struct FakeTranscoder {
        pub fail: bool,
        pub skip_output: bool,
        pub consume_input: bool,
        pub inputs: RefCell<Vec<PathBuf>>,
    }

    impl Transcoder for FakeTranscoder {
        fn transcode(
            &self,
            input: &Path,
            output: &Path,
            settings: &TranscodeSettings,
        ) -> Result<(), TranscodeError> {
            assert_eq!(*settings, ARCHIVE_SETTINGS);
            self.inputs.borrow_mut().push(input.to_path_buf());
            if self.fail {
                return Err(TranscodeError::Failed {
                    status: "exit status: 1".to_string(),
                    detail: "Invalid data found when processing input".to_string(),
                });
            }
            if !self.skip_output {
                std::fs::copy(input, output)?;
            }
            if self.consume_input {
                std::fs::remove_file(input)?;
            }
            Ok(())
        }
    }

    /// Records tag writes; fails when the file is missing, like a real reader.
    #[derive(Default)]
    pub struct FakeTagger {
        pub fail: bool,
        pub written: RefCell<Vec<(PathBuf, String, String, String)>>,
    }

    impl TagWriter for FakeTagger {
        fn write_tags(&self, path: &Path, tags: &TrackTags<'_>) -> Result<(), TagError> {
            if self.fail {
                return Err(TagError::Write("file is locked".to_string()));
            }
            if !path.exists() {
                return Err(TagError::Read(format!("{} not found", path.display())));
            }
            self.written.borrow_mut().push((
                path.to_path_buf(),
                tags.title.to_string(),
                tags.artist.to_string(),
                tags.album.to_string(),
            ));
            Ok(())
        }
    }
}
