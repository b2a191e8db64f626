//! Embedded metadata for archived files, written with `lofty`.

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::Tag;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("failed to read tags: {0}")]
    Read(String),

    #[error("no writable tag available for {0}")]
    NoWritableTag(String),

    #[error("failed to write tags: {0}")]
    Write(String),
}

/// Title, artist and album as they appear in the playlist (not normalized).
#[derive(Clone, Copy, Debug)]
pub struct TrackTags<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
}

pub trait TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags<'_>) -> Result<(), TagError>;
}

/// Writes the file's primary tag format (ID3v2 for MP3), creating an empty
/// tag first when the file has none.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoftyTagWriter;

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags<'_>) -> Result<(), TagError> {
        let mut tagged_file =
            read_from_path(path).map_err(|error| TagError::Read(error.to_string()))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }

        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| TagError::NoWritableTag(format!("{:?}", tag_type)))?;

        tag.set_title(tags.title.to_string());
        tag.set_artist(tags.artist.to_string());
        tag.set_album(tags.album.to_string());

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|error| TagError::Write(error.to_string()))
    }
}
