//! Sequential run over a playlist.
//!
//! Entries are handled strictly in playlist order, one at a time. Each entry
//! is independently idempotent through the ledger check, so an interrupted
//! run simply resumes on the next invocation.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::fetcher::TrackFetcher;
use crate::ledger::Ledger;
use crate::models::{Outcome, PlaylistEntry, RunSummary};
use crate::pipeline::Pipeline;
use crate::progress::RunProgress;
use crate::tagger::TagWriter;
use crate::transcoder::Transcoder;

pub struct PlaylistRunner<F, T, W> {
    ledger: Ledger,
    pipeline: Pipeline<F, T, W>,
    pause_between: Duration,
}

impl<F, T, W> PlaylistRunner<F, T, W>
where
    F: TrackFetcher,
    T: Transcoder,
    W: TagWriter,
{
    pub fn new(ledger: Ledger, pipeline: Pipeline<F, T, W>) -> Self {
        Self {
            ledger,
            pipeline,
            pause_between: Duration::ZERO,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between = pause;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn pipeline(&self) -> &Pipeline<F, T, W> {
        &self.pipeline
    }

    /// Process every entry. Per-entry failures are recorded and counted;
    /// only ledger failures abort the run.
    pub fn run(&self, entries: &[PlaylistEntry], progress: &RunProgress) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for entry in entries {
            if self.ledger.is_satisfied(entry)? {
                summary.skipped += 1;
                progress.notice(&format!("Skipped (already downloaded): {}", entry.label()));
            } else {
                let outcome = self.process_entry(entry, progress);
                match &outcome {
                    Outcome::Success => {
                        summary.downloaded += 1;
                        info!(track = %entry.label(), "downloaded");
                    }
                    failed => {
                        summary.errored += 1;
                        warn!(track = %entry.label(), status = %failed.status(), "entry failed");
                        progress.notice(&format!("Failed: {} ({})", entry.label(), failed.status()));
                    }
                }
                self.ledger.record(entry, &outcome)?;
            }

            summary.processed += 1;
            progress.entry_done(&summary);

            if !self.pause_between.is_zero() {
                std::thread::sleep(self.pause_between);
            }
        }

        progress.finish();
        Ok(summary)
    }

    fn process_entry(&self, entry: &PlaylistEntry, progress: &RunProgress) -> Outcome {
        let bar = progress.track_bar(&entry.label());
        let outcome = self.pipeline.process(entry, &mut |fraction| {
            bar.set_position((fraction * 1000.0).round() as u64);
        });
        bar.finish_and_clear();
        outcome
    }

    /// Entries that a run would hand to the pipeline. Reads the ledger only.
    pub fn pending<'a>(&self, entries: &'a [PlaylistEntry]) -> Result<Vec<&'a PlaylistEntry>> {
        let mut pending = Vec::new();
        for entry in entries {
            if !self.ledger.is_satisfied(entry)? {
                pending.push(entry);
            }
        }
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fakes::{FakeFetcher, FakeTagger, FakeTranscoder};
    use tempfile::TempDir;

    type FakeRunner = PlaylistRunner<FakeFetcher, FakeTranscoder, FakeTagger>;

    fn runner(dir: &TempDir, fetcher: FakeFetcher) -> FakeRunner {
        let ledger = Ledger::open(&dir.path().join("data/downloads.db")).unwrap();
        let pipeline = Pipeline::new(
            fetcher,
            FakeTranscoder::default(),
            FakeTagger::default(),
            dir.path().join("music"),
        );
        PlaylistRunner::new(ledger, pipeline)
    }

    fn entries(n: usize) -> Vec<PlaylistEntry> {
        (1..=n)
            .map(|i| {
                PlaylistEntry::new(
                    &format!("Song {}", i),
                    &format!("Artist {}", i),
                    "Album",
                    Some(format!("US000000{}", i).as_str()),
                    &format!("sp{}", i),
                )
            })
            .collect()
    }

    fn run(runner: &FakeRunner, entries: &[PlaylistEntry]) -> RunSummary {
        runner.run(entries, &RunProgress::hidden(entries.len())).unwrap()
    }

    #[test]
    fn test_rerun_skips_everything() {
        let dir = TempDir::new().unwrap();
        let playlist = entries(3);

        let first = runner(&dir, FakeFetcher::new());
        let summary = run(&first, &playlist);
        assert_eq!(summary, RunSummary { processed: 3, downloaded: 3, skipped: 0, errored: 0 });
        assert_eq!(first.pipeline().fetcher_calls(), 3);

        let second = runner(&dir, FakeFetcher::new());
        let summary = run(&second, &playlist);
        assert_eq!(summary, RunSummary { processed: 3, downloaded: 0, skipped: 3, errored: 0 });
        assert_eq!(second.pipeline().fetcher_calls(), 0);
        // skipped entries are not appended
        assert_eq!(second.ledger().len().unwrap(), 3);
    }

    #[test]
    fn test_failure_is_isolated() {
        let dir = TempDir::new().unwrap();
        let playlist = entries(5);
        let fetcher = FakeFetcher::new().failing_on(&playlist[2].search_query());
        let runner = runner(&dir, fetcher);

        let summary = run(&runner, &playlist);

        assert_eq!(summary, RunSummary { processed: 5, downloaded: 4, skipped: 0, errored: 1 });
        assert_eq!(runner.pipeline().fetcher_calls(), 5);

        let records = runner.ledger().records().unwrap();
        assert_eq!(records.len(), 5);
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Song 1", "Song 2", "Song 3", "Song 4", "Song 5"]);
        assert!(records[2].status.starts_with("error:fetch_failed"));
        assert!(records.iter().enumerate().all(|(i, r)| i == 2 || r.status == "success"));
    }

    #[test]
    fn test_failed_entry_is_retried_next_run() {
        let dir = TempDir::new().unwrap();
        let playlist = entries(2);
        let fetcher = FakeFetcher::new().failing_on(&playlist[1].search_query());
        run(&runner(&dir, fetcher), &playlist);

        let second = runner(&dir, FakeFetcher::new());
        let summary = run(&second, &playlist);

        assert_eq!(summary, RunSummary { processed: 2, downloaded: 1, skipped: 1, errored: 0 });
        assert_eq!(second.pipeline().fetcher_calls(), 1);
        // failure history is kept alongside the later success
        assert_eq!(second.ledger().len().unwrap(), 3);
    }

    #[test]
    fn test_mixed_scenario() {
        let dir = TempDir::new().unwrap();
        let playlist = vec![
            PlaylistEntry::new("Song One", "Artist", "Album", Some("US1234567"), "a"),
            PlaylistEntry::new("Song Two", "Artist", "Album", Some("US2222222"), "b"),
            PlaylistEntry::new("Song Three", "Artist", "Album", None, "c"),
        ];
        let fetcher = FakeFetcher::new().failing_on(&playlist[1].search_query());
        let runner = runner(&dir, fetcher);
        let earlier = PlaylistEntry::new("Renamed Upload", "Other", "X", Some("US1234567"), "z");
        runner.ledger().record(&earlier, &Outcome::Success).unwrap();

        let summary = run(&runner, &playlist);

        assert_eq!(summary, RunSummary { processed: 3, downloaded: 1, skipped: 1, errored: 1 });
        assert_eq!(runner.pipeline().fetcher_calls(), 2);
        assert!(dir.path().join("music/Song Three - Artist.mp3").exists());
        assert!(!dir.path().join("music/Song One - Artist.mp3").exists());
    }

    #[test]
    fn test_duplicate_within_playlist_downloads_once() {
        let dir = TempDir::new().unwrap();
        let playlist = vec![
            PlaylistEntry::new("Lose Yourself", "Eminem", "8 Mile", None, "a"),
            PlaylistEntry::new("lose yourself", "EMINEM ", "8 Mile", None, "b"),
        ];
        let runner = runner(&dir, FakeFetcher::new());

        let summary = run(&runner, &playlist);

        assert_eq!(summary, RunSummary { processed: 2, downloaded: 1, skipped: 1, errored: 0 });
    }

    #[test]
    fn test_pending_reads_without_writing() {
        let dir = TempDir::new().unwrap();
        let playlist = entries(3);
        let runner = runner(&dir, FakeFetcher::new());
        runner.ledger().record(&playlist[0], &Outcome::Success).unwrap();

        let pending = runner.pending(&playlist).unwrap();

        assert_eq!(pending, vec![&playlist[1], &playlist[2]]);
        assert_eq!(runner.ledger().len().unwrap(), 1);
        assert_eq!(runner.pipeline().fetcher_calls(), 0);
    }

    #[test]
    fn test_empty_playlist() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir, FakeFetcher::new());
        assert_eq!(run(&runner, &[]), RunSummary::default());
    }

    #[test]
    fn test_ledger_failure_aborts_run() {
        use crate::fetcher::FetchError;
        use std::cell::Cell;
        use std::path::{Path, PathBuf};
        use std::rc::Rc;

        // overwrites the ledger with garbage while downloading
        struct LedgerClobber {
            db: PathBuf,
            calls: Rc<Cell<usize>>,
        }
        impl TrackFetcher for LedgerClobber {
            fn fetch(&self, _: &str, stem: &Path, _: &mut dyn FnMut(f32)) -> Result<PathBuf, FetchError> {
                self.calls.set(self.calls.get() + 1);
                std::fs::write(&self.db, vec![0xAB; 4096])?;
                let path = stem.with_extension("webm");
                std::fs::write(&path, b"source audio")?;
                Ok(path)
            }
        }

        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data/downloads.db");
        let calls = Rc::new(Cell::new(0));
        let fetcher = LedgerClobber {
            db: db.clone(),
            calls: Rc::clone(&calls),
        };
        let pipeline = Pipeline::new(
            fetcher,
            FakeTranscoder::default(),
            FakeTagger::default(),
            dir.path().join("music"),
        );
        let runner = PlaylistRunner::new(Ledger::open(&db).unwrap(), pipeline);
        let playlist = entries(3);

        let result = runner.run(&playlist, &RunProgress::hidden(playlist.len()));

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
