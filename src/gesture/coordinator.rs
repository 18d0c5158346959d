use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::Track;
use crate::config::GestureSettings;

use super::feedback::{Feedback, FeedbackGate};
use super::session::{GestureSession, GestureTarget};

/// The two playback commands gestures can produce.
pub trait PlaybackCommands {
    fn play(&self, track: &Track);

    fn seek(&self, secs: f64);
}

impl<T: PlaybackCommands + ?Sized> PlaybackCommands for &T {
    fn play(&self, track: &Track) {
        (**self).play(track)
    }

    fn seek(&self, secs: f64) {
        (**self).seek(secs)
    }
}

impl<T: PlaybackCommands + ?Sized> PlaybackCommands for Arc<T> {
    fn play(&self, track: &Track) {
        (**self).play(track)
    }

    fn seek(&self, secs: f64) {
        (**self).seek(secs)
    }
}

impl<T: PlaybackCommands + ?Sized> PlaybackCommands for Rc<T> {
    fn play(&self, track: &Track) {
        (**self).play(track)
    }

    fn seek(&self, secs: f64) {
        (**self).seek(secs)
    }
}

/// Speculative state of a drag in progress. Nothing here is committed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GestureUpdate {
    pub target: GestureTarget,
    /// Carousel: `[-1, 0]`, waveform: `[0, 1]`.
    pub progress: f32,
    /// Waveform only: the time the fill currently points at.
    pub speculative_secs: Option<f64>,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GestureOutcome {
    /// The carousel advanced and the new track was sent to playback.
    IndexChanged { index: usize },
    /// The waveform drag seeked the current track.
    Seeked { secs: f64 },
    /// The drag did not reach its commit condition.
    Reverted,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GestureRelease {
    pub target: GestureTarget,
    pub outcome: GestureOutcome,
    /// `Some(Feedback::Commit)` when the gesture committed.
    pub feedback: Option<Feedback>,
}

/// Maps carousel swipes and waveform scrubs onto discrete playback commands.
///
/// The committed carousel index is the single source of truth for which
/// track the UI shows; every change of it plays exactly that track once.
pub struct SwipeSeekCoordinator<P: PlaybackCommands> {
    tracks: Vec<Track>,
    current_index: usize,
    card_width: f32,
    waveform_width: f32,
    settings: GestureSettings,
    session: Option<GestureSession>,
    playback: P,
}

impl<P: PlaybackCommands> SwipeSeekCoordinator<P> {
    pub fn new(tracks: Vec<Track>, playback: P, settings: GestureSettings) -> Self {
        Self {
            tracks,
            current_index: 0,
            card_width: 0.0,
            waveform_width: 0.0,
            settings,
            session: None,
            playback,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    /// Layout feedback: width of one carousel card.
    pub fn set_card_width(&mut self, width: f32) {
        self.card_width = width.max(0.0);
    }

    /// Layout feedback: width of the waveform strip.
    pub fn set_waveform_width(&mut self, width: f32) {
        self.waveform_width = width.max(0.0);
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Carousel drag progress while a swipe is in flight.
    pub fn swipe_progress(&self) -> Option<f32> {
        self.session
            .as_ref()
            .filter(|s| s.target == GestureTarget::Carousel)
            .map(|s| self.carousel_progress(s.delta()))
    }

    /// Waveform fill progress while a scrub is in flight.
    pub fn scrub_progress(&self) -> Option<f32> {
        self.session
            .as_ref()
            .filter(|s| s.target == GestureTarget::Waveform)
            .map(|s| self.waveform_progress(s.offset))
    }

    /// Start a drag at `x`. Any uncommitted drag is discarded.
    pub fn begin(&mut self, target: GestureTarget, x: f32) {
        if let Some(prev) = self.session.take() {
            debug!(gesture = ?prev.target, "discarding unfinished gesture");
        }
        let start = match target {
            GestureTarget::Carousel => 0.0,
            GestureTarget::Waveform => self.waveform_progress(x),
        };
        self.session = Some(GestureSession::start(
            target,
            x,
            FeedbackGate::new(self.settings.feedback_step, start),
        ));
    }

    /// Pointer moved to `x`. Never issues playback commands.
    pub fn update(&mut self, x: f32) -> Option<GestureUpdate> {
        let mut session = self.session.take()?;
        session.offset = x;

        let (progress, speculative_secs) = match session.target {
            GestureTarget::Carousel => (self.carousel_progress(session.delta()), None),
            GestureTarget::Waveform => {
                let progress = self.waveform_progress(x);
                (progress, Some(self.time_at(progress)))
            }
        };
        let feedback = session.gate.observe(progress);
        let target = session.target;
        self.session = Some(session);

        Some(GestureUpdate {
            target,
            progress,
            speculative_secs,
            feedback,
        })
    }

    /// Pointer released at `x`: commit or revert, and end the session.
    pub fn release(&mut self, x: f32) -> Option<GestureRelease> {
        let mut session = self.session.take()?;
        session.offset = x;

        let outcome = match session.target {
            GestureTarget::Carousel => {
                let travelled = -session.delta();
                let needed = self.settings.commit_threshold * self.card_width;
                if self.card_width > 0.0 && travelled >= needed {
                    match self.next_index() {
                        Some(next) => {
                            self.commit_index(next);
                            GestureOutcome::IndexChanged { index: next }
                        }
                        None => GestureOutcome::Reverted,
                    }
                } else {
                    GestureOutcome::Reverted
                }
            }
            GestureTarget::Waveform => match self.current_track() {
                Some(_) if self.waveform_width > 0.0 => {
                    let secs = self.time_at(self.waveform_progress(x));
                    self.playback.seek(secs);
                    GestureOutcome::Seeked { secs }
                }
                _ => GestureOutcome::Reverted,
            },
        };

        session.committed = outcome != GestureOutcome::Reverted;
        debug!(gesture = ?session.target, ?outcome, "gesture released");
        Some(GestureRelease {
            target: session.target,
            outcome,
            feedback: session.committed.then_some(Feedback::Commit),
        })
    }

    /// Drop the current drag without committing.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// External selection. Returns whether the index changed.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() || index == self.current_index {
            return false;
        }
        self.commit_index(index);
        true
    }

    /// Move to the next card, wrapping around.
    pub fn advance(&mut self) -> bool {
        match self.next_index() {
            Some(next) => self.select(next),
            None => false,
        }
    }

    /// Move to the previous card, wrapping around.
    pub fn retreat(&mut self) -> bool {
        let len = self.tracks.len();
        if len < 2 {
            return false;
        }
        self.select((self.current_index + len - 1) % len)
    }

    /// Play (or toggle) the track under the current card.
    pub fn play_current(&self) {
        if let Some(track) = self.current_track() {
            self.playback.play(track);
        }
    }

    fn next_index(&self) -> Option<usize> {
        let len = self.tracks.len();
        // With a single card the index cannot change.
        (len > 1).then(|| (self.current_index + 1) % len)
    }

    fn commit_index(&mut self, index: usize) {
        self.current_index = index;
        debug!(index, "carousel index committed");
        self.playback.play(&self.tracks[index]);
    }

    fn carousel_progress(&self, delta: f32) -> f32 {
        if self.card_width <= 0.0 {
            return 0.0;
        }
        (delta / self.card_width).clamp(-1.0, 0.0)
    }

    fn waveform_progress(&self, x: f32) -> f32 {
        if self.waveform_width <= 0.0 {
            return 0.0;
        }
        (x / self.waveform_width).clamp(0.0, 1.0)
    }

    fn time_at(&self, progress: f32) -> f64 {
        let duration = self.current_track().map_or(0.0, |t| t.duration_secs());
        progress as f64 * duration
    }
}
