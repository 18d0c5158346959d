use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::AudioSettings;

use super::backend::{AudioBackend, Fetcher};
use super::controller::PlaybackController;
use super::fetch::ThreadFetcher;
use super::types::{AudioCmd, NowPlayingSurface, PlaybackHandle};

/// Spawn the audio thread that owns the controller.
///
/// The backend is built inside the thread because output devices are not
/// guaranteed to be `Send`. Observation ticks are driven by the
/// `recv_timeout` deadline, so they interleave with commands on the same
/// thread and can never observe a stream that was already released.
pub(super) fn spawn_audio_thread<F, B>(
    make_backend: F,
    tx: Sender<AudioCmd>,
    rx: Receiver<AudioCmd>,
    playback_info: PlaybackHandle,
    surface: Box<dyn NowPlayingSurface + Send>,
    audio_settings: AudioSettings,
) -> JoinHandle<()>
where
    F: FnOnce(Sender<AudioCmd>) -> B + Send + 'static,
    B: AudioBackend + 'static,
{
    thread::spawn(move || {
        let backend = make_backend(tx.clone());
        let fetcher: Box<dyn Fetcher> = Box::new(ThreadFetcher::new(tx));
        let mut controller =
            PlaybackController::new(Box::new(backend), fetcher, surface, playback_info);
        controller.activate_session();

        let tick = Duration::from_millis(audio_settings.tick_interval_ms.max(1));
        let retry = Duration::from_millis(audio_settings.session_retry_ms.max(1));
        let mut next_tick = Instant::now() + tick;
        let mut next_retry = Instant::now() + retry;

        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match rx.recv_timeout(timeout) {
                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    info!("audio thread quitting");
                    controller.shutdown(Duration::from_millis(fade_out_ms));
                    break;
                }
                Ok(cmd) => controller.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    controller.on_tick();
                    next_tick += tick;
                    if next_tick <= now {
                        // Fell behind (slow command); skip the missed ticks.
                        next_tick = now + tick;
                    }

                    if !controller.session_active() && now >= next_retry {
                        debug!("retrying audio session activation");
                        controller.activate_session();
                        next_retry = now + retry;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    controller.stop();
                    break;
                }
            }
        }
    })
}
