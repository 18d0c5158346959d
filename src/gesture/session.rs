use super::feedback::FeedbackGate;

/// What a drag is manipulating.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureTarget {
    /// The song carousel: leftward drags advance to the next card.
    Carousel,
    /// The waveform: horizontal position selects a playback time.
    Waveform,
}

/// One in-flight drag. Lives from press to release and is never reused.
#[derive(Debug, Clone)]
pub struct GestureSession {
    pub target: GestureTarget,
    /// Pointer x at press.
    pub origin: f32,
    /// Latest pointer x.
    pub offset: f32,
    pub committed: bool,
    pub(super) gate: FeedbackGate,
}

impl GestureSession {
    pub(super) fn start(target: GestureTarget, x: f32, gate: FeedbackGate) -> Self {
        Self {
            target,
            origin: x,
            offset: x,
            committed: false,
            gate,
        }
    }

    /// Horizontal travel since press; negative is leftward.
    pub fn delta(&self) -> f32 {
        self.offset - self.origin
    }
}
