/// Haptic-style feedback emitted while dragging.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Light tick: the drag travelled another `step` of progress.
    Tick,
    /// Strong one-shot: a gesture committed.
    Commit,
}

/// Rate limiter for [`Feedback::Tick`].
///
/// Accumulates the absolute progress travelled since the last trigger and
/// fires once it reaches `step`, so jitter back and forth still counts as
/// movement but a single pixel never does.
#[derive(Debug, Clone)]
pub struct FeedbackGate {
    step: f32,
    last: f32,
    travelled: f32,
}

impl FeedbackGate {
    pub fn new(step: f32, start: f32) -> Self {
        Self {
            step,
            last: start,
            travelled: 0.0,
        }
    }

    pub fn observe(&mut self, progress: f32) -> Option<Feedback> {
        self.travelled += (progress - self.last).abs();
        self.last = progress;
        // Tolerate float drift so ten 0.01 moves trigger a 0.1 step.
        if self.travelled + 1e-4 >= self.step {
            self.travelled = 0.0;
            Some(Feedback::Tick)
        } else {
            None
        }
    }
}
