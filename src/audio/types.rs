//! Audio-related small types and handles.
//!
//! This module defines the commands accepted by the audio thread, the
//! playback info shared with the UI, and the now-playing record handed to
//! the system display surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::catalog::Track;
use crate::error::PlaybackError;

/// Lifecycle of the single active stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlayState {
    /// No track loaded.
    #[default]
    Idle,
    /// Stream requested, not yet ready.
    Loading,
    Playing,
    Paused,
}

/// Monotonic token identifying one stream attachment.
///
/// Every new track bumps the generation; async results carrying an older
/// generation belong to a superseded stream and are dropped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Signals raised by the host audio system.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SystemSignal {
    /// Another client took the output device.
    InterruptionBegan,
    /// The interruption is over; `resume_allowed` says whether playback may restart.
    InterruptionEnded { resume_allowed: bool },
    /// The current output route went away (headphones unplugged, etc.).
    RouteRemoved,
}

/// Remote transport controls (media keys, MPRIS, lock screen).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    PlayPause,
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Play `track`, or toggle pause/resume when it is already current.
    Play(Track),
    /// Release the stream and return to idle.
    Stop,
    /// Seek the current track to the given position in seconds (clamped).
    Seek(f64),
    Remote(RemoteCommand),
    Signal(SystemSignal),
    /// Stream bytes fetched off-thread for `generation`.
    StreamLoaded {
        generation: Generation,
        result: Result<Vec<u8>, PlaybackError>,
    },
    /// Cover art bytes fetched off-thread for `generation`.
    ArtworkLoaded {
        generation: Generation,
        result: Result<Vec<u8>, PlaybackError>,
    },
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// Track owning the active stream (if any).
    pub track: Option<Track>,
    pub state: PlayState,
    /// Elapsed playback time for the current track.
    pub elapsed: Duration,
    /// Last absorbed failure, cleared when a new track starts.
    pub last_error: Option<PlaybackError>,
}

impl PlaybackInfo {
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.id.as_str())
    }

    pub fn duration(&self) -> Duration {
        self.track.as_ref().map_or(Duration::ZERO, |t| t.duration)
    }

    /// Elapsed fraction of the track in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let total = self.duration().as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (self.elapsed.as_secs_f64() / total).clamp(0.0, 1.0)
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Snapshot published to the system now-playing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    /// Cover art reference from the catalog (may be empty).
    pub artwork_url: String,
    /// Fetched cover art, once available.
    pub artwork: Option<Arc<[u8]>>,
    pub elapsed: Duration,
    pub duration: Duration,
    /// 1.0 while playing, 0.0 otherwise.
    pub rate: f64,
    pub state: PlayState,
}

/// Write-only sink for now-playing metadata. Best-effort: implementations
/// must not block and have no way to report failure.
pub trait NowPlayingSurface {
    fn publish(&self, now_playing: &NowPlaying);
    fn clear(&self);
}
