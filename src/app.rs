//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the gesture coordinator,
//! the playback handle published by the audio thread and the hit areas the
//! last frame was drawn with.

mod model;

pub use model::*;
