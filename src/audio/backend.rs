//! Seams between the controller and the host: the output device, the
//! attached stream, and the off-thread fetcher.

use std::time::Duration;

use crate::error::PlaybackError;

use super::types::Generation;

/// The host output device.
pub trait AudioBackend {
    /// Open (or reopen) the output device.
    fn activate(&mut self) -> Result<(), PlaybackError>;

    fn is_active(&self) -> bool;

    /// Decode `bytes` into a new paused stream positioned at `start_at`.
    fn attach(
        &mut self,
        bytes: Vec<u8>,
        start_at: Duration,
    ) -> Result<Box<dyn AudioStream>, PlaybackError>;
}

/// One attached stream. Dropping it releases the device resources.
pub trait AudioStream {
    fn play(&mut self);

    fn pause(&mut self);

    /// Seek to `to` and return the position the device settled on.
    fn seek(&mut self, to: Duration) -> Duration;

    fn position(&self) -> Duration;

    /// True once the stream has played all of its content.
    fn finished(&self) -> bool;

    /// Ramp the volume down over `over` before teardown.
    fn fade_out(&mut self, _over: Duration) {}
}

/// Starts asynchronous fetches whose results come back to the audio
/// thread as `AudioCmd::StreamLoaded` / `AudioCmd::ArtworkLoaded`.
pub trait Fetcher {
    fn fetch_stream(&self, generation: Generation, uri: &str);

    fn fetch_artwork(&self, generation: Generation, uri: &str);
}
