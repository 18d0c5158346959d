//! Error types shared across the player.
//!
//! Playback failures never escape the audio thread: they are recorded in the
//! shared playback info and logged. Catalog failures abort startup.

use std::path::PathBuf;

use thiserror::Error;

/// Recoverable playback conditions surfaced through the playback info.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The stream could not be fetched or decoded.
    #[error("failed to open stream: {0}")]
    StreamOpenFailed(String),

    /// The output device could not be activated.
    #[error("audio session unavailable: {0}")]
    AudioSessionUnavailable(String),

    /// Cover art could not be fetched; playback continues without it.
    #[error("failed to fetch artwork: {0}")]
    ArtworkFetchFailed(String),
}

/// Errors raised while loading the track catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid track {id:?}: {reason}")]
    InvalidTrack { id: String, reason: String },

    #[error("duplicate track id {0:?}")]
    DuplicateId(String),

    #[error("catalog {0} contains no playable tracks")]
    Empty(PathBuf),
}
