//! Playlist archiving library - shared modules for all binaries.

pub mod config;
pub mod fetcher;
pub mod ledger;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod playlist;
pub mod progress;
pub mod runner;
pub mod safety;
pub mod tagger;
pub mod transcoder;
