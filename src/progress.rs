//! Progress bar and logging utilities.
//!
//! One overall bar tracks entries; each fetch gets a transient bar fed with
//! download fractions. In log-only mode bars are hidden and periodic lines go
//! to stderr instead, for tail-friendly output.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::RunSummary;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Per-track download bar, 0-100 with one decimal.
pub fn create_track_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(1000);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg:32!} [{bar:30.green/white}] {percent:>3}%")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message(truncate_label(label, 30));
    pb
}

/// Log progress periodically for tail-friendly output.
/// Only logs when in log-only mode and at specified intervals.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && (current % interval == 0 || current == total) {
        let pct = 100.0 * current as f64 / total as f64;
        eprintln!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(max_chars).collect();
        short.push_str("...");
        short
    }
}

/// Fall back to plain stderr when the bar-aware print failed.
/// Returns true when the fallback was used.
fn print_or_fallback(printed: std::io::Result<()>, line: &str) -> bool {
    match printed {
        Ok(()) => false,
        Err(_) => {
            eprintln!("{}", line);
            true
        }
    }
}

/// Console reporting for a playlist run.
pub struct RunProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    total: u64,
    hidden: bool,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();
        if is_log_only() {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        let overall = multi.add(create_progress_bar(total as u64, "Overall"));
        Self {
            multi,
            overall,
            total: total as u64,
            hidden: is_log_only(),
        }
    }

    /// Reporter that draws nothing, for tests and dry runs.
    pub fn hidden(total: usize) -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let overall = multi.add(ProgressBar::hidden());
        overall.set_length(total as u64);
        Self {
            multi,
            overall,
            total: total as u64,
            hidden: true,
        }
    }

    /// Print a notice above the bars (or plainly in log-only mode).
    pub fn notice(&self, line: &str) {
        if self.hidden {
            eprintln!("{}", line);
        } else {
            print_or_fallback(self.multi.println(line), line);
        }
    }

    /// Start a transient bar for one track.
    pub fn track_bar(&self, label: &str) -> ProgressBar {
        if self.hidden {
            return ProgressBar::hidden();
        }
        self.multi.add(create_track_bar(label))
    }

    /// Advance the overall bar after an entry, whichever branch it took.
    pub fn entry_done(&self, summary: &RunSummary) {
        self.overall.inc(1);
        self.overall.set_message(format!(
            "ok {} | skip {} | err {}",
            summary.downloaded, summary.skipped, summary.errored
        ));
        log_progress("entries", self.overall.position(), self.total, 10);
    }

    pub fn finish(&self) {
        self.overall.finish_and_clear();
    }
}

/// Render the end-of-run summary box.
pub fn format_summary(summary: &RunSummary, elapsed: Duration) -> String {
    let rule = format!("{:=<40}", "");
    format!(
        "{rule}\n| Total tracks: {:<10}              |\n| Downloaded:   {:<10}              |\n| Skipped:      {:<10}              |\n| Errors:       {:<10}              |\n| Elapsed:      {:<10}              |\n{rule}",
        summary.processed,
        summary.downloaded,
        summary.skipped,
        summary.errored,
        format_duration(elapsed),
        rule = rule,
    )
}
