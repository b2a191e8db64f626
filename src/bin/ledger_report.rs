//! Summarize the completion ledger: attempts, successes, failures by kind,
//! and the most recent failures.
//!
//! Usage: ledger-report [--db data/spotify_downloads.db] [--limit 20] [--json]

use anyhow::Result;
use clap::Parser;
use playlist_archiver::config;
use playlist_archiver::ledger::Ledger;
use playlist_archiver::models::{error_kind, CompletionRecord, STATUS_SUCCESS};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-report")]
#[command(about = "Report on the download ledger")]
struct Args {
    #[arg(long, env = "PLAYLIST_DB", default_value = config::DEFAULT_STORE_PATH)]
    db: PathBuf,

    /// How many recent failures to list
    #[arg(long, default_value = "20")]
    limit: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    total: usize,
    succeeded: usize,
    failed: usize,
    failures_by_kind: Vec<(String, usize)>,
    recent_failures: Vec<CompletionRecord>,
}

fn build_report(records: &[CompletionRecord], recent_failures: Vec<CompletionRecord>) -> Report {
    let mut by_kind: FxHashMap<String, usize> = FxHashMap::default();
    let mut succeeded = 0;
    for record in records {
        if record.status == STATUS_SUCCESS {
            succeeded += 1;
        } else {
            let kind = error_kind(&record.status).unwrap_or("unclassified");
            *by_kind.entry(kind.to_string()).or_default() += 1;
        }
    }

    let mut failures_by_kind: Vec<(String, usize)> = by_kind.into_iter().collect();
    failures_by_kind.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Report {
        total: records.len(),
        succeeded,
        failed: records.len() - succeeded,
        failures_by_kind,
        recent_failures,
    }
}

fn print_report(report: &Report) {
    println!("{:=<60}", "");
    println!("Ledger report");
    println!("  Attempts:  {}", report.total);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed:    {}", report.failed);
    if !report.failures_by_kind.is_empty() {
        println!("\nFailures by kind:");
        for (kind, count) in &report.failures_by_kind {
            println!("  {:<20} {}", kind, count);
        }
    }
    if !report.recent_failures.is_empty() {
        println!("\nMost recent failures:");
        for r in &report.recent_failures {
            println!("  [{}] {} - {} @ {}", r.id, r.title, r.artist, r.recorded_at);
            println!("      {}", r.status);
        }
    }
    println!("{:=<60}", "");
}

fn main() -> Result<()> {
    let args = Args::parse();

    let ledger = Ledger::open_read_only(&args.db)?;

    let records = ledger.records()?;
    let recent = ledger.recent_failures(args.limit)?;
    let report = build_report(&records, recent);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
