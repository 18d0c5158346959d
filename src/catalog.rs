//! Track catalog: the static, ordered list of songs shown in the carousel.
//!
//! The catalog is read once at startup, either from a TOML manifest or by
//! scanning a directory of audio files.

mod manifest;
mod model;
mod scan;

use std::path::Path;

use crate::config::CatalogSettings;
use crate::error::CatalogError;

pub use manifest::load_manifest;
pub use model::*;
pub use scan::scan;

/// Load tracks from `source`: a directory is scanned, anything else is
/// parsed as a manifest. An empty catalog is an error.
pub fn load(source: &Path, settings: &CatalogSettings) -> Result<Vec<Track>, CatalogError> {
    let tracks = if source.is_dir() {
        scan(source, settings)
    } else {
        load_manifest(source)?
    };

    if tracks.is_empty() {
        return Err(CatalogError::Empty(source.to_path_buf()));
    }
    Ok(tracks)
}
