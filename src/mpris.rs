//! MPRIS bridge: the system now-playing surface and remote transport controls.
//!
//! The audio thread publishes into [`MprisHandle`] (a [`NowPlayingSurface`]);
//! the D-Bus side reads the shared state on demand and forwards remote
//! method calls to the UI loop as [`ControlCmd`]s.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, info, warn};
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::audio::{NowPlaying, NowPlayingSurface, PlayState};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.encore";
const TRACK_PATH_PREFIX: &str = "/org/encore/track";

#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek, in seconds.
    SeekBy(f64),
    /// Absolute position, in seconds.
    SetPosition(f64),
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlayState,
    title: Option<String>,
    artist: Vec<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    rate: f64,
    track_id: Option<OwnedObjectPath>,
    /// Track whose artwork was last written to disk.
    art_written_for: Option<String>,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    fn store_artwork(&self, now: &NowPlaying, state: &mut SharedState) {
        if let Some(bytes) = now.artwork.as_ref() {
            if state.art_written_for.as_deref() == Some(now.track_id.as_str()) {
                return;
            }
            let path = artwork_path(&now.track_id);
            match std::fs::write(&path, bytes) {
                Ok(()) => {
                    state.art_url = Some(format!("file://{}", path.display()));
                    state.art_written_for = Some(now.track_id.clone());
                }
                Err(e) => debug!(error = %e, "could not cache artwork"),
            }
        } else if state.art_written_for.as_deref() != Some(now.track_id.as_str()) {
            state.art_url = remote_art_url(&now.artwork_url);
        }
    }
}

impl NowPlayingSurface for MprisHandle {
    fn publish(&self, now: &NowPlaying) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };

        let track_id = track_object_path(&now.track_id);
        let art_before = s.art_url.clone();
        let changed = s.playback != now.state || s.track_id != track_id;

        s.playback = now.state;
        s.title = Some(now.title.clone());
        s.artist = if now.artist.is_empty() {
            Vec::new()
        } else {
            vec![now.artist.clone()]
        };
        s.length_micros = Some(now.duration.as_micros() as i64);
        s.position_micros = now.elapsed.as_micros() as i64;
        s.rate = now.rate;
        s.track_id = track_id;
        self.store_artwork(now, &mut s);

        // Position is polled by clients; only announce status and metadata changes.
        if changed || s.art_url != art_before {
            let _ = self.notify.send(());
        }
    }

    fn clear(&self) {
        if let Ok(mut s) = self.state.lock() {
            *s = SharedState::default();
        }
        let _ = self.notify.send(());
    }
}

/// D-Bus object paths only allow `[A-Za-z0-9_]` segments.
fn track_object_path(track_id: &str) -> Option<OwnedObjectPath> {
    let segment: String = track_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let segment = if segment.is_empty() {
        "_".to_string()
    } else {
        segment
    };
    ObjectPath::try_from(format!("{TRACK_PATH_PREFIX}/{segment}"))
        .ok()
        .map(OwnedObjectPath::from)
}

fn artwork_path(track_id: &str) -> PathBuf {
    let name: String = track_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    std::env::temp_dir().join(format!("encore-art-{name}"))
}

fn remote_art_url(reference: &str) -> Option<String> {
    if reference.is_empty() {
        None
    } else if reference.contains("://") {
        Some(reference.to_string())
    } else {
        Some(format!("file://{reference}"))
    }
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "encore"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string(), "http".to_string(), "https".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    /// `offset` is in microseconds.
    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::SeekBy(offset as f64 / 1_000_000.0));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let current = self.state.lock().ok().and_then(|s| s.track_id.clone());
        // Requests for a track that is no longer current are ignored.
        if current.as_ref().map(|p| p.as_str()) != Some(track_id.as_str()) {
            return;
        }
        let _ = self
            .tx
            .send(ControlCmd::SetPosition(position as f64 / 1_000_000.0));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlayState::Idle => "Stopped",
            PlayState::Playing => "Playing",
            // Loading has no MPRIS equivalent; nothing is audible yet.
            PlayState::Loading | PlayState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        self.state.lock().map(|s| s.rate).unwrap_or(0.0)
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.playback != PlayState::Idle)
            .unwrap_or(false)
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(v) = s
            .track_id
            .as_ref()
            .and_then(|p| owned(Value::from(p.clone().into_inner())))
        {
            map.insert("mpris:trackid".to_string(), v);
        }
        if let Some(v) = s.title.clone().and_then(|t| owned(Value::from(t))) {
            map.insert("xesam:title".to_string(), v);
        }
        if !s.artist.is_empty() {
            if let Some(v) = owned(Value::from(s.artist.clone())) {
                map.insert("xesam:artist".to_string(), v);
            }
        }
        if let Some(v) = s.length_micros.and_then(|l| owned(Value::from(l))) {
            map.insert("mpris:length".to_string(), v);
        }
        if let Some(v) = s.art_url.clone().and_then(|u| owned(Value::from(u))) {
            map.insert("mpris:artUrl".to_string(), v);
        }
        map
    }
}

/// Register the MPRIS service on a background thread.
///
/// Failure to reach the session bus is logged and otherwise ignored: the
/// player keeps working without a system surface.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "MPRIS: failed to connect to session bus");
                    return;
                }
            };

            if let Err(e) = connection.request_name(BUS_NAME).await {
                warn!(error = %e, "MPRIS: failed to acquire name");
                return;
            }

            let object_server = connection.object_server();

            if let Err(e) = object_server
                .at(OBJECT_PATH, RootIface { tx: tx.clone() })
                .await
            {
                warn!(error = %e, "MPRIS: failed to register root iface");
                return;
            }

            if let Err(e) = object_server
                .at(
                    OBJECT_PATH,
                    PlayerIface {
                        tx,
                        state: state_for_thread,
                    },
                )
                .await
            {
                warn!(error = %e, "MPRIS: failed to register player iface");
                return;
            }

            let player = match object_server
                .interface::<_, PlayerIface>(OBJECT_PATH)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "MPRIS: player iface vanished");
                    return;
                }
            };
            info!(name = BUS_NAME, "MPRIS service registered");

            forward_changes(&player, &notify_rx).await;
        });
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

/// Emit `PropertiesChanged` whenever the audio thread reports a change.
async fn forward_changes(player: &InterfaceRef<PlayerIface>, notify: &Receiver<()>) {
    loop {
        Timer::after(Duration::from_millis(100)).await;

        let mut pending = false;
        loop {
            match notify.try_recv() {
                Ok(()) => pending = true,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }
        if !pending {
            continue;
        }

        let iface = player.get().await;
        let emitter = player.signal_emitter();
        if let Err(e) = iface.playback_status_changed(emitter).await {
            debug!(error = %e, "MPRIS: failed to signal status change");
        }
        if let Err(e) = iface.metadata_changed(emitter).await {
            debug!(error = %e, "MPRIS: failed to signal metadata change");
        }
        if let Err(e) = iface.rate_changed(emitter).await {
            debug!(error = %e, "MPRIS: failed to signal rate change");
        }
        if let Err(e) = iface.can_seek_changed(emitter).await {
            debug!(error = %e, "MPRIS: failed to signal seekability change");
        }
    }
}
