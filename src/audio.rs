//! Audio subsystem: the playback controller and the thread that drives it.
//!
//! `AudioPlayer` is the handle the rest of the app talks to. It forwards
//! commands to a dedicated audio thread which owns the
//! [`PlaybackController`], the only component allowed to touch the stream.

mod backend;
mod controller;
mod fetch;
mod player;
mod sink;
mod thread;
mod types;

pub use backend::{AudioBackend, AudioStream, Fetcher};
pub use controller::{PlaybackController, clamp_seek};
pub use player::AudioPlayer;
pub use types::*;

#[cfg(test)]
mod tests;
