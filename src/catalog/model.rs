use std::time::Duration;

/// Display color of a track card.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

/// One playable song of the catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub category: String,
    /// Cover art reference (URL or path); empty when the track has none.
    pub cover_art: String,
    /// Stream reference: `http(s)://` or `file://` URL, or a filesystem path.
    pub audio_url: String,
    pub duration: Duration,
    pub description: String,
    pub color: Rgb,
    /// Non-negative magnitudes, repeated cyclically across the rendered width.
    pub waveform: Vec<f32>,
}

impl Track {
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Magnitude of bar `i`, wrapping around the pattern.
    pub fn amplitude_at(&self, i: usize) -> f32 {
        if self.waveform.is_empty() {
            return 0.0;
        }
        self.waveform[i % self.waveform.len()]
    }

    /// `width` bars of the waveform, normalized to the pattern's peak.
    pub fn waveform_bars(&self, width: usize) -> Vec<f32> {
        let peak = self.waveform.iter().copied().fold(0.0_f32, f32::max);
        (0..width)
            .map(|i| {
                if peak > 0.0 {
                    self.amplitude_at(i) / peak
                } else {
                    0.0
                }
            })
            .collect()
    }
}
