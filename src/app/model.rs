//! Application model: `App` and the hit areas used for mouse gestures.
//!
//! `App` owns the [`SwipeSeekCoordinator`] and translates terminal mouse
//! events (cell coordinates) into gesture positions.

use std::time::{Duration, Instant};

use ratatui::layout::{Position, Rect};

use crate::audio::{PlaybackHandle, PlaybackInfo};
use crate::catalog::Track;
use crate::gesture::{
    Feedback, GestureOutcome, GestureTarget, PlaybackCommands, SwipeSeekCoordinator,
};

/// How long a feedback flash stays on screen.
pub const FLASH_DURATION: Duration = Duration::from_millis(150);

/// Screen regions that accept drags, as drawn in the last frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HitAreas {
    pub card: Rect,
    pub waveform: Rect,
}

/// The main application model.
pub struct App<P: PlaybackCommands> {
    pub coordinator: SwipeSeekCoordinator<P>,
    pub playback_handle: Option<PlaybackHandle>,
    pub hit_areas: HitAreas,
    pub show_description: bool,
    pub catalog_source: Option<String>,
    flash: Option<(Feedback, Instant)>,
}

impl<P: PlaybackCommands> App<P> {
    pub fn new(coordinator: SwipeSeekCoordinator<P>) -> Self {
        Self {
            coordinator,
            playback_handle: None,
            hit_areas: HitAreas::default(),
            show_description: false,
            catalog_source: None,
            flash: None,
        }
    }

    /// Attach a `PlaybackHandle` used to observe playback progress.
    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback_handle = Some(h);
    }

    /// Record where the catalog came from, for the status line.
    pub fn set_catalog_source(&mut self, source: String) {
        self.catalog_source = Some(source);
    }

    pub fn toggle_description(&mut self) {
        self.show_description = !self.show_description;
    }

    pub fn tracks(&self) -> &[Track] {
        self.coordinator.tracks()
    }

    /// The track under the committed carousel card.
    pub fn current_track(&self) -> Option<&Track> {
        self.coordinator.current_track()
    }

    /// Copy of the latest playback info, or the idle default.
    pub fn playback(&self) -> PlaybackInfo {
        self.playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|info| info.clone()))
            .unwrap_or_default()
    }

    /// Whether the audio thread is working on the track under the card.
    pub fn is_current_loaded(&self, info: &PlaybackInfo) -> bool {
        match (info.track_id(), self.current_track()) {
            (Some(playing), Some(current)) => playing == current.id,
            _ => false,
        }
    }

    /// Update the hit areas and feed their widths back to the coordinator.
    pub fn set_hit_areas(&mut self, areas: HitAreas) {
        self.hit_areas = areas;
        self.coordinator.set_card_width(areas.card.width as f32);
        self.coordinator
            .set_waveform_width(areas.waveform.width as f32);
    }

    /// Pointer pressed at a terminal cell.
    pub fn mouse_down(&mut self, column: u16, row: u16) {
        let pos = Position::new(column, row);
        if self.hit_areas.waveform.contains(pos) {
            let x = self.waveform_x(column);
            self.coordinator.begin(GestureTarget::Waveform, x);
        } else if self.hit_areas.card.contains(pos) {
            self.coordinator.begin(GestureTarget::Carousel, column as f32);
        }
    }

    /// Pointer dragged. Rows are ignored: a drag keeps its target.
    pub fn mouse_drag(&mut self, column: u16) {
        let Some(target) = self.coordinator.session().map(|s| s.target) else {
            return;
        };
        let x = self.gesture_x(target, column);
        if let Some(update) = self.coordinator.update(x) {
            if let Some(feedback) = update.feedback {
                self.flash(feedback);
            }
        }
    }

    /// Pointer released. Returns what the gesture resolved to.
    pub fn mouse_up(&mut self, column: u16) -> Option<GestureOutcome> {
        let target = self.coordinator.session().map(|s| s.target)?;
        let x = self.gesture_x(target, column);
        let release = self.coordinator.release(x)?;
        if let Some(feedback) = release.feedback {
            self.flash(feedback);
        }
        Some(release.outcome)
    }

    /// Play (or toggle) the track under the card.
    pub fn play_pause(&self) {
        self.coordinator.play_current();
    }

    pub fn next(&mut self) -> bool {
        self.coordinator.advance()
    }

    pub fn prev(&mut self) -> bool {
        self.coordinator.retreat()
    }

    /// Feedback to render, if it is still fresh at `now`.
    pub fn active_flash(&self, now: Instant) -> Option<Feedback> {
        self.flash
            .filter(|(_, at)| now.saturating_duration_since(*at) < FLASH_DURATION)
            .map(|(feedback, _)| feedback)
    }

    fn flash(&mut self, feedback: Feedback) {
        self.flash = Some((feedback, Instant::now()));
    }

    fn gesture_x(&self, target: GestureTarget, column: u16) -> f32 {
        match target {
            GestureTarget::Carousel => column as f32,
            GestureTarget::Waveform => self.waveform_x(column),
        }
    }

    /// Column relative to the waveform's left edge. The cell under the
    /// pointer counts as filled; anything left of the strip is 0.
    fn waveform_x(&self, column: u16) -> f32 {
        let area = self.hit_areas.waveform;
        if column < area.x {
            return 0.0;
        }
        (column - area.x).saturating_add(1) as f32
    }
}
