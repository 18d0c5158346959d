use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::catalog::Track;
use crate::config::AudioSettings;
use crate::gesture::PlaybackCommands;

use super::backend::AudioBackend;
use super::sink::RodioBackend;
use super::thread::spawn_audio_thread;
use super::types::{
    AudioCmd, NowPlayingSurface, PlaybackHandle, PlaybackInfo, RemoteCommand, SystemSignal,
};

/// Handle to the audio thread. Commands are fire-and-forget; results are
/// observed through [`AudioPlayer::playback_handle`].
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(audio_settings: AudioSettings, surface: Box<dyn NowPlayingSurface + Send>) -> Self {
        Self::with_backend(RodioBackend::new, audio_settings, surface)
    }

    /// Spawn the audio thread with a custom output backend. The factory
    /// receives the audio channel so the device can post host signals.
    pub fn with_backend<F, B>(
        make_backend: F,
        audio_settings: AudioSettings,
        surface: Box<dyn NowPlayingSurface + Send>,
    ) -> Self
    where
        F: FnOnce(Sender<AudioCmd>) -> B + Send + 'static,
        B: AudioBackend + 'static,
    {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let audio_handle = spawn_audio_thread(
            make_backend,
            tx.clone(),
            rx,
            playback_info.clone(),
            surface,
            audio_settings,
        );

        Self {
            tx,
            playback: playback_info,
            join: Mutex::new(Some(audio_handle)),
        }
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    /// Copy of the current playback info.
    pub fn snapshot(&self) -> PlaybackInfo {
        self.playback
            .lock()
            .map(|info| info.clone())
            .unwrap_or_default()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    pub fn play(&self, track: Track) {
        let _ = self.send(AudioCmd::Play(track));
    }

    pub fn stop(&self) {
        let _ = self.send(AudioCmd::Stop);
    }

    pub fn seek(&self, secs: f64) {
        let _ = self.send(AudioCmd::Seek(secs));
    }

    /// Seek relative to the last published position.
    pub fn seek_by(&self, delta_secs: f64) {
        let elapsed = self.snapshot().elapsed.as_secs_f64();
        self.seek(elapsed + delta_secs);
    }

    pub fn remote(&self, cmd: RemoteCommand) {
        let _ = self.send(AudioCmd::Remote(cmd));
    }

    pub fn signal(&self, signal: SystemSignal) {
        let _ = self.send(AudioCmd::Signal(signal));
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl PlaybackCommands for AudioPlayer {
    fn play(&self, track: &Track) {
        AudioPlayer::play(self, track.clone());
    }

    fn seek(&self, secs: f64) {
        AudioPlayer::seek(self, secs);
    }
}
