//! Gesture-to-playback mapping for the carousel and the waveform.
//!
//! Drags are speculative until released: while a pointer moves, the
//! coordinator only reports progress for rendering. Releasing either commits
//! one discrete command (select the next track, seek once) or reverts.

mod coordinator;
mod feedback;
mod session;

pub use coordinator::*;
pub use feedback::{Feedback, FeedbackGate};
pub use session::{GestureSession, GestureTarget};
