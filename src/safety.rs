//! Sanity checks on the configured paths before a run touches anything.
//!
//! These catch layouts that would clobber the playlist with the ledger or
//! write audio "into" a regular file.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;

/// Validates that the configured paths do not collide.
///
/// Checks:
/// - The ledger cannot be the playlist export
/// - The output directory cannot be an existing regular file
/// - The output directory cannot be the ledger or the playlist
pub fn validate_layout(config: &Config) -> Result<()> {
    if same_path(&config.store_path, &config.input_path) {
        bail!(
            "Safety check failed: ledger '{}' cannot be the same as playlist '{}'",
            config.store_path.display(),
            config.input_path.display()
        );
    }

    if config.output_dir.is_file() {
        bail!(
            "Safety check failed: output directory '{}' is an existing file",
            config.output_dir.display()
        );
    }

    for (what, path) in [("ledger", &config.store_path), ("playlist", &config.input_path)] {
        if same_path(&config.output_dir, path) {
            bail!(
                "Safety check failed: output directory '{}' cannot be the {}",
                config.output_dir.display(),
                what
            );
        }
    }

    Ok(())
}

/// Compare canonical forms when both exist, otherwise the literal paths
/// (ignoring a trailing separator).
fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a.components().eq(b.components()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout_is_valid() {
        assert!(validate_layout(&Config::default()).is_ok());
    }

    #[test]
    fn test_ledger_equals_playlist() {
        let config = Config {
            store_path: PathBuf::from("data/playlist.csv"),
            ..Config::default()
        };
        let result = validate_layout(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as playlist"));
    }

    #[test]
    fn test_output_dir_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("music");
        std::fs::write(&file, b"").unwrap();
        let config = Config {
            output_dir: file,
            ..Config::default()
        };
        assert!(validate_layout(&config)
            .unwrap_err()
            .to_string()
            .contains("is an existing file"));
    }

    #[test]
    fn test_output_dir_equals_ledger() {
        let config = Config {
            output_dir: PathBuf::from("data/spotify_downloads.db/"),
            ..Config::default()
        };
        assert!(validate_layout(&config).is_err());
    }
}
