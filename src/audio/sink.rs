//! `rodio` implementation of the output device and attached streams.
//!
//! Stream bytes are decoded in memory and appended to a paused `Sink`
//! connected to the default output stream's mixer. Losing the device is
//! reported back to the audio thread as a removed route.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, cpal};
use tracing::{debug, info, warn};

use crate::error::PlaybackError;

use super::backend::{AudioBackend, AudioStream};
use super::types::{AudioCmd, SystemSignal};

pub struct RodioBackend {
    stream: Option<OutputStream>,
    /// Set by the stream's error callback once the device is gone.
    lost: Arc<AtomicBool>,
    tx: Sender<AudioCmd>,
}

impl RodioBackend {
    pub fn new(tx: Sender<AudioCmd>) -> Self {
        Self {
            stream: None,
            lost: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }
}

/// Error callback for one output stream. The first device loss marks
/// `lost` and posts a single `RouteRemoved`.
pub(super) fn device_error_handler(
    lost: Arc<AtomicBool>,
    tx: Sender<AudioCmd>,
) -> impl FnMut(cpal::StreamError) + Send + Clone + 'static {
    move |err| match err {
        cpal::StreamError::DeviceNotAvailable => {
            if !lost.swap(true, Ordering::SeqCst) {
                warn!("output device lost");
                let _ = tx.send(AudioCmd::Signal(SystemSignal::RouteRemoved));
            }
        }
        other => warn!(error = %other, "output stream error"),
    }
}

impl AudioBackend for RodioBackend {
    fn activate(&mut self) -> Result<(), PlaybackError> {
        if self.is_active() {
            return Ok(());
        }
        let reopening = self.stream.take().is_some();

        // A fresh flag per stream, so a late callback from the old one
        // can't mark the new one lost.
        let lost = Arc::new(AtomicBool::new(false));
        let mut stream = OutputStreamBuilder::from_default_device()
            .map_err(|e| PlaybackError::AudioSessionUnavailable(e.to_string()))?
            .with_error_callback(device_error_handler(lost.clone(), self.tx.clone()))
            .open_stream()
            .map_err(|e| PlaybackError::AudioSessionUnavailable(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped, which would
        // scribble over the TUI.
        stream.log_on_drop(false);
        if reopening {
            info!("output device reopened");
        }
        self.stream = Some(stream);
        self.lost = lost;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.stream.is_some() && !self.lost.load(Ordering::SeqCst)
    }

    fn attach(
        &mut self,
        bytes: Vec<u8>,
        start_at: Duration,
    ) -> Result<Box<dyn AudioStream>, PlaybackError> {
        let output = match self.stream.as_ref() {
            Some(output) if !self.lost.load(Ordering::SeqCst) => output,
            _ => {
                return Err(PlaybackError::AudioSessionUnavailable(
                    "output stream is not open".to_string(),
                ));
            }
        };

        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| PlaybackError::StreamOpenFailed(e.to_string()))?;

        let sink = Sink::connect_new(output.mixer());
        sink.append(source);
        sink.pause();
        if !start_at.is_zero() {
            if let Err(e) = sink.try_seek(start_at) {
                debug!(error = %e, "initial seek failed, starting from the top");
            }
        }
        Ok(Box::new(RodioStream { sink }))
    }
}

struct RodioStream {
    sink: Sink,
}

impl AudioStream for RodioStream {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, to: Duration) -> Duration {
        if let Err(e) = self.sink.try_seek(to) {
            debug!(error = %e, "device refused seek");
        }
        self.sink.get_pos()
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn finished(&self) -> bool {
        self.sink.empty()
    }

    fn fade_out(&mut self, over: Duration) {
        let fade_out_ms = over.as_millis() as u64;
        if fade_out_ms == 0 {
            self.sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            self.sink.set_volume(1.0 - t);
            thread::sleep(Duration::from_millis(step_ms));
        }
        self.sink.set_volume(0.0);
    }
}

impl Drop for RodioStream {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
