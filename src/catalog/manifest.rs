//! TOML manifest loader.
//!
//! A manifest is a list of `[[tracks]]` tables. Relative `audio_url` and
//! `cover_art` paths are resolved against the manifest's directory.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CatalogError;

use super::model::{Rgb, Track};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    tracks: Vec<TrackEntry>,
}

#[derive(Debug, Deserialize)]
struct TrackEntry {
    id: String,
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    cover_art: String,
    audio_url: String,
    /// Seconds.
    duration: f64,
    #[serde(default)]
    description: String,
    #[serde(default = "default_color")]
    color: String,
    #[serde(default)]
    waveform: Vec<f32>,
}

fn default_color() -> String {
    "#8a8a8a".to_string()
}

pub fn load_manifest(path: &Path) -> Result<Vec<Track>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_manifest(&text, base)
}

pub(super) fn parse_manifest(text: &str, base: &Path) -> Result<Vec<Track>, CatalogError> {
    let manifest: Manifest = toml::from_str(text)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut tracks = Vec::with_capacity(manifest.tracks.len());
    for entry in manifest.tracks {
        if !seen.insert(entry.id.clone()) {
            return Err(CatalogError::DuplicateId(entry.id));
        }
        tracks.push(entry.into_track(base)?);
    }
    Ok(tracks)
}

impl TrackEntry {
    fn into_track(self, base: &Path) -> Result<Track, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidTrack {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id is empty"));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title is empty"));
        }
        if self.audio_url.trim().is_empty() {
            return Err(invalid("audio_url is empty"));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(invalid("duration must be a positive number of seconds"));
        }
        let duration = Duration::try_from_secs_f64(self.duration)
            .map_err(|_| invalid("duration out of range"))?;
        if self.waveform.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(invalid("waveform magnitudes must be non-negative"));
        }
        let color = Rgb::parse_hex(&self.color).ok_or_else(|| invalid("color must be #rrggbb"))?;

        Ok(Track {
            audio_url: resolve_reference(&self.audio_url, base),
            cover_art: resolve_reference(&self.cover_art, base),
            duration,
            color,
            id: self.id,
            title: self.title,
            category: self.category,
            description: self.description,
            waveform: self.waveform,
        })
    }
}

/// URLs pass through untouched; relative paths are joined onto `base`.
fn resolve_reference(reference: &str, base: &Path) -> String {
    let reference = reference.trim();
    if reference.is_empty() || reference.contains("://") {
        return reference.to_string();
    }
    let path = Path::new(reference);
    if path.is_absolute() {
        reference.to_string()
    } else {
        base.join(path).display().to_string()
    }
}
