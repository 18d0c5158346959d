use std::path::Path;

use lofty::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::CatalogSettings;

use super::model::{Rgb, Track};

/// Card colors handed out to scanned tracks in order.
const PALETTE: [Rgb; 6] = [
    Rgb { r: 0xe0, g: 0x6c, b: 0x75 },
    Rgb { r: 0x61, g: 0xaf, b: 0xef },
    Rgb { r: 0x98, g: 0xc3, b: 0x79 },
    Rgb { r: 0xe5, g: 0xc0, b: 0x7b },
    Rgb { r: 0xc6, g: 0x78, b: 0xdd },
    Rgb { r: 0x56, g: 0xb6, b: 0xc2 },
];

pub(super) fn is_audio_file(path: &Path, settings: &CatalogSettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Build tracks from the audio files below `dir`.
///
/// Files whose duration cannot be read are skipped: the player needs a
/// positive duration to scrub.
pub fn scan(dir: &Path, settings: &CatalogSettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let tagged = match lofty::read_from_path(path) {
            Ok(t) => t,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable audio file");
                continue;
            }
        };
        let duration = tagged.properties().duration();
        if duration.is_zero() {
            debug!(path = %path.display(), "skipping audio file without duration");
            continue;
        }

        let mut title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let mut category = String::new();
        let mut description = String::new();

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = tag.title().filter(|v| !v.trim().is_empty()) {
                title = v.trim().to_string();
            }
            if let Some(v) = tag.artist().filter(|v| !v.trim().is_empty()) {
                category = v.trim().to_string();
            } else if let Some(v) = tag.genre().filter(|v| !v.trim().is_empty()) {
                category = v.trim().to_string();
            }
            if let Some(v) = tag.album().filter(|v| !v.trim().is_empty()) {
                description = v.trim().to_string();
            }
        }

        let id = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .display()
            .to_string();

        tracks.push(Track {
            id,
            title,
            category,
            cover_art: String::new(),
            audio_url: path.display().to_string(),
            duration,
            description,
            color: Rgb { r: 0, g: 0, b: 0 },
            waveform: settings.default_waveform.clone(),
        });
    }

    tracks.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    for (i, track) in tracks.iter_mut().enumerate() {
        track.color = PALETTE[i % PALETTE.len()];
    }
    tracks
}
