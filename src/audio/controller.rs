//! The playback state machine.
//!
//! `PlaybackController` owns the single active stream and is driven from
//! one thread only: commands, async completions and observation ticks are
//! all delivered as method calls on that thread. Async completions carry a
//! [`Generation`]; anything not matching the current one is dropped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::Track;
use crate::error::PlaybackError;

use super::backend::{AudioBackend, AudioStream, Fetcher};
use super::types::{
    AudioCmd, Generation, NowPlaying, NowPlayingSurface, PlayState, PlaybackHandle,
    RemoteCommand, SystemSignal,
};

pub struct PlaybackController {
    backend: Box<dyn AudioBackend>,
    fetcher: Box<dyn Fetcher>,
    surface: Box<dyn NowPlayingSurface>,
    info: PlaybackHandle,

    state: PlayState,
    track: Option<Track>,
    stream: Option<Box<dyn AudioStream>>,
    elapsed: Duration,
    generation: Generation,
    /// Generation of the active time-observation registration.
    observer: Option<Generation>,

    /// Seek requested while loading, applied once the stream attaches.
    pending_seek: Option<Duration>,
    /// The stream should attach paused (interruption or route loss while loading).
    hold_on_ready: bool,
    /// The current pause was caused by an interruption.
    interrupted: bool,
    artwork: Option<Arc<[u8]>>,
    last_error: Option<PlaybackError>,
}

impl PlaybackController {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        fetcher: Box<dyn Fetcher>,
        surface: Box<dyn NowPlayingSurface>,
        info: PlaybackHandle,
    ) -> Self {
        Self {
            backend,
            fetcher,
            surface,
            info,
            state: PlayState::Idle,
            track: None,
            stream: None,
            elapsed: Duration::ZERO,
            generation: Generation::default(),
            observer: None,
            pending_seek: None,
            hold_on_ready: false,
            interrupted: false,
            artwork: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Whether a time-observation registration is active.
    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    pub fn session_active(&self) -> bool {
        self.backend.is_active()
    }

    /// Try to (re)activate the output device. Returns whether it is usable.
    pub fn activate_session(&mut self) -> bool {
        match self.backend.activate() {
            Ok(()) => {
                if matches!(
                    self.last_error,
                    Some(PlaybackError::AudioSessionUnavailable(_))
                ) {
                    info!("audio session reactivated");
                    self.last_error = None;
                    self.sync();
                }
                true
            }
            Err(e) => {
                if self.last_error.as_ref() != Some(&e) {
                    warn!(error = %e, "audio session unavailable");
                    self.last_error = Some(e);
                    self.sync();
                }
                false
            }
        }
    }

    /// Dispatch one command received by the audio thread.
    pub fn handle(&mut self, cmd: AudioCmd) {
        match cmd {
            AudioCmd::Play(track) => self.play(track),
            AudioCmd::Stop => self.stop(),
            AudioCmd::Seek(secs) => self.seek(secs),
            AudioCmd::Remote(remote) => self.remote(remote),
            AudioCmd::Signal(signal) => self.signal(signal),
            AudioCmd::StreamLoaded { generation, result } => {
                self.on_stream_loaded(generation, result)
            }
            AudioCmd::ArtworkLoaded { generation, result } => {
                self.on_artwork_loaded(generation, result)
            }
            AudioCmd::Quit { fade_out_ms } => self.shutdown(Duration::from_millis(fade_out_ms)),
        }
    }

    /// Play `track`. Pressing play on the current track toggles pause/resume.
    pub fn play(&mut self, track: Track) {
        if !self.backend.is_active() {
            debug!(track = %track.id, "play ignored: audio session unavailable");
            return;
        }

        let same_track = self.track.as_ref().is_some_and(|t| t.id == track.id);
        if same_track {
            match self.state {
                PlayState::Playing => self.pause(),
                PlayState::Paused => self.resume(),
                PlayState::Loading => debug!(track = %track.id, "already loading"),
                PlayState::Idle => {}
            }
            return;
        }

        self.release();
        self.generation = self.generation.next();
        self.elapsed = Duration::ZERO;
        self.pending_seek = None;
        self.hold_on_ready = false;
        self.interrupted = false;
        self.artwork = None;
        self.last_error = None;
        self.state = PlayState::Loading;

        info!(track = %track.id, generation = ?self.generation, "loading stream");
        self.fetcher.fetch_stream(self.generation, &track.audio_url);
        if !track.cover_art.is_empty() {
            self.fetcher.fetch_artwork(self.generation, &track.cover_art);
        }
        self.track = Some(track);

        self.sync();
        self.publish();
    }

    /// Pause if playing; no-op in any other state.
    pub fn pause(&mut self) {
        self.interrupted = false;
        self.pause_stream();
    }

    /// Release the stream and return to idle. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let was_idle = self.state == PlayState::Idle && self.track.is_none();
        self.release();
        self.track = None;
        self.elapsed = Duration::ZERO;
        self.pending_seek = None;
        self.hold_on_ready = false;
        self.interrupted = false;
        self.artwork = None;
        self.state = PlayState::Idle;

        if !was_idle {
            debug!("stopped");
            self.surface.clear();
        }
        self.sync();
    }

    /// Seek to `secs`, clamped to `[0, duration]`.
    ///
    /// Elapsed time is updated before the device is asked to move, then
    /// reconciled with where it actually settled.
    pub fn seek(&mut self, secs: f64) {
        let Some(duration) = self.track.as_ref().map(|t| t.duration) else {
            return;
        };
        let target = clamp_seek(secs, duration);

        match self.state {
            PlayState::Playing | PlayState::Paused => {
                self.elapsed = target;
                self.sync();
                if let Some(stream) = self.stream.as_mut() {
                    let settled = stream.seek(target);
                    self.elapsed = settled.min(duration);
                }
                debug!(target = ?target, settled = ?self.elapsed, "seek");
                self.sync();
                self.publish();
            }
            PlayState::Loading => {
                self.pending_seek = Some(target);
                self.elapsed = target;
                self.sync();
            }
            PlayState::Idle => {}
        }
    }

    pub fn remote(&mut self, cmd: RemoteCommand) {
        match (cmd, self.state) {
            (RemoteCommand::Play, PlayState::Paused)
            | (RemoteCommand::PlayPause, PlayState::Paused) => self.resume(),
            (RemoteCommand::Pause, PlayState::Playing)
            | (RemoteCommand::PlayPause, PlayState::Playing) => self.pause(),
            (cmd, state) => debug!(?cmd, ?state, "remote command ignored"),
        }
    }

    pub fn signal(&mut self, signal: SystemSignal) {
        match signal {
            SystemSignal::InterruptionBegan => match self.state {
                PlayState::Playing => {
                    info!("interruption began, pausing");
                    self.pause_stream();
                    self.interrupted = true;
                }
                PlayState::Loading => {
                    self.hold_on_ready = true;
                    self.interrupted = true;
                }
                PlayState::Paused | PlayState::Idle => {}
            },
            SystemSignal::InterruptionEnded { resume_allowed } => {
                let was_interrupted = std::mem::take(&mut self.interrupted);
                if !(was_interrupted && resume_allowed) {
                    debug!(resume_allowed, "interruption ended, staying paused");
                    return;
                }
                match self.state {
                    PlayState::Paused => {
                        info!("interruption ended, resuming");
                        self.resume();
                    }
                    PlayState::Loading => self.hold_on_ready = false,
                    PlayState::Playing | PlayState::Idle => {}
                }
            }
            SystemSignal::RouteRemoved => {
                self.interrupted = false;
                match self.state {
                    PlayState::Playing => {
                        info!("output route removed, pausing");
                        self.pause_stream();
                    }
                    PlayState::Loading => self.hold_on_ready = true,
                    PlayState::Paused | PlayState::Idle => {}
                }
            }
        }
    }

    /// Stream bytes for `generation` arrived (or failed to).
    pub fn on_stream_loaded(
        &mut self,
        generation: Generation,
        result: Result<Vec<u8>, PlaybackError>,
    ) {
        if generation != self.generation || self.state != PlayState::Loading {
            debug!(?generation, current = ?self.generation, "dropping stale stream");
            return;
        }

        let start_at = self.pending_seek.take().unwrap_or(Duration::ZERO);
        let attached = result.and_then(|bytes| self.backend.attach(bytes, start_at));

        match attached {
            Ok(mut stream) => {
                self.elapsed = stream.position();
                if self.hold_on_ready {
                    self.state = PlayState::Paused;
                } else {
                    stream.play();
                    self.state = PlayState::Playing;
                }
                self.hold_on_ready = false;
                self.stream = Some(stream);
                self.observer = Some(self.generation);
                info!(generation = ?self.generation, state = ?self.state, "stream ready");
                self.sync();
                self.publish();
            }
            Err(e) => {
                warn!(error = %e, "stream failed to open");
                self.stop();
                self.last_error = Some(e);
                self.sync();
            }
        }
    }

    /// Cover art for `generation` arrived. Failures only lose the artwork.
    pub fn on_artwork_loaded(
        &mut self,
        generation: Generation,
        result: Result<Vec<u8>, PlaybackError>,
    ) {
        if generation != self.generation || self.track.is_none() {
            return;
        }
        match result {
            Ok(bytes) => {
                self.artwork = Some(bytes.into());
                self.publish();
            }
            Err(e) => debug!(error = %e, "continuing without artwork"),
        }
    }

    /// Periodic time observation.
    pub fn on_tick(&mut self) {
        if self.observer != Some(self.generation) {
            return;
        }
        let Some(stream) = self.stream.as_ref() else {
            return;
        };

        if self.state == PlayState::Playing && stream.finished() {
            info!("end of track");
            self.stop();
            return;
        }

        if self.state == PlayState::Playing {
            let duration = self.track.as_ref().map_or(Duration::ZERO, |t| t.duration);
            self.elapsed = stream.position().min(duration);
            self.sync();
            self.publish();
        }
    }

    /// Fade out and stop before the audio thread exits.
    pub fn shutdown(&mut self, fade_out: Duration) {
        if self.state == PlayState::Playing {
            if let Some(stream) = self.stream.as_mut() {
                stream.fade_out(fade_out);
            }
        }
        self.stop();
    }

    fn resume(&mut self) {
        if self.state != PlayState::Paused {
            return;
        }
        if !self.backend.is_active() {
            debug!("resume ignored: audio session unavailable");
            return;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.play();
        }
        self.interrupted = false;
        self.state = PlayState::Playing;
        self.sync();
        self.publish();
    }

    fn pause_stream(&mut self) {
        if self.state != PlayState::Playing {
            return;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.pause();
            let duration = self.track.as_ref().map_or(Duration::ZERO, |t| t.duration);
            self.elapsed = stream.position().min(duration);
        }
        self.state = PlayState::Paused;
        self.sync();
        self.publish();
    }

    /// Cancel observation and drop the active stream.
    fn release(&mut self) {
        self.observer = None;
        if let Some(stream) = self.stream.take() {
            debug!(generation = ?self.generation, "releasing stream");
            drop(stream);
        }
    }

    fn sync(&self) {
        if let Ok(mut info) = self.info.lock() {
            info.track = self.track.clone();
            info.state = self.state;
            info.elapsed = self.elapsed;
            info.last_error = self.last_error.clone();
        }
    }

    fn publish(&self) {
        let Some(track) = self.track.as_ref() else {
            return;
        };
        self.surface.publish(&NowPlaying {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.category.clone(),
            artwork_url: track.cover_art.clone(),
            artwork: self.artwork.clone(),
            elapsed: self.elapsed,
            duration: track.duration,
            rate: if self.state == PlayState::Playing {
                1.0
            } else {
                0.0
            },
            state: self.state,
        });
    }
}

/// Clamp a seek request in seconds to `[0, duration]`; NaN maps to 0.
pub fn clamp_seek(secs: f64, duration: Duration) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    if secs >= duration.as_secs_f64() {
        return duration;
    }
    Duration::from_secs_f64(secs)
}
