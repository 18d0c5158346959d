use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::*;
use crate::catalog::{Rgb, Track};
use crate::config::{AudioSettings, GestureSettings};
use crate::error::PlaybackError;
use crate::gesture::{GestureTarget, PlaybackCommands, SwipeSeekCoordinator};

// ---- fakes -----------------------------------------------------------------

#[derive(Debug, Default)]
struct Device {
    active: bool,
    activate_fails: bool,
    attached: usize,
    live_streams: usize,
    playing: bool,
    position: Duration,
    finished: bool,
    /// Where the next seek settles instead of its target.
    settle_at: Option<Duration>,
    last_start_at: Option<Duration>,
    fade_outs: usize,
}

type DeviceLog = Arc<Mutex<Device>>;

struct FakeBackend(DeviceLog);

impl AudioBackend for FakeBackend {
    fn activate(&mut self) -> Result<(), PlaybackError> {
        let mut d = self.0.lock().unwrap();
        if d.activate_fails {
            return Err(PlaybackError::AudioSessionUnavailable("no device".into()));
        }
        d.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.0.lock().unwrap().active
    }

    fn attach(
        &mut self,
        bytes: Vec<u8>,
        start_at: Duration,
    ) -> Result<Box<dyn AudioStream>, PlaybackError> {
        if bytes == b"garbage" {
            return Err(PlaybackError::StreamOpenFailed("unsupported format".into()));
        }
        let mut d = self.0.lock().unwrap();
        d.attached += 1;
        d.live_streams += 1;
        d.playing = false;
        d.finished = false;
        d.position = start_at;
        d.last_start_at = Some(start_at);
        Ok(Box::new(FakeStream(self.0.clone())))
    }
}

struct FakeStream(DeviceLog);

impl AudioStream for FakeStream {
    fn play(&mut self) {
        self.0.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().playing = false;
    }

    fn seek(&mut self, to: Duration) -> Duration {
        let mut d = self.0.lock().unwrap();
        d.position = d.settle_at.take().unwrap_or(to);
        d.position
    }

    fn position(&self) -> Duration {
        self.0.lock().unwrap().position
    }

    fn finished(&self) -> bool {
        self.0.lock().unwrap().finished
    }

    fn fade_out(&mut self, _over: Duration) {
        self.0.lock().unwrap().fade_outs += 1;
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        let mut d = self.0.lock().unwrap();
        d.live_streams -= 1;
        d.playing = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Request {
    Stream(Generation, String),
    Artwork(Generation, String),
}

struct FakeFetcher(Rc<RefCell<Vec<Request>>>);

impl Fetcher for FakeFetcher {
    fn fetch_stream(&self, generation: Generation, uri: &str) {
        self.0
            .borrow_mut()
            .push(Request::Stream(generation, uri.to_string()));
    }

    fn fetch_artwork(&self, generation: Generation, uri: &str) {
        self.0
            .borrow_mut()
            .push(Request::Artwork(generation, uri.to_string()));
    }
}

#[derive(Debug, Default)]
struct SurfaceLog {
    published: Vec<NowPlaying>,
    clears: usize,
}

struct FakeSurface(Rc<RefCell<SurfaceLog>>);

impl NowPlayingSurface for FakeSurface {
    fn publish(&self, now_playing: &NowPlaying) {
        self.0.borrow_mut().published.push(now_playing.clone());
    }

    fn clear(&self) {
        self.0.borrow_mut().clears += 1;
    }
}

/// Shared views into everything a controller touches.
#[derive(Default)]
struct Rig {
    device: DeviceLog,
    requests: Rc<RefCell<Vec<Request>>>,
    surface: Rc<RefCell<SurfaceLog>>,
    info: PlaybackHandle,
}

impl Rig {
    fn controller(&self) -> PlaybackController {
        let mut c = PlaybackController::new(
            Box::new(FakeBackend(self.device.clone())),
            Box::new(FakeFetcher(self.requests.clone())),
            Box::new(FakeSurface(self.surface.clone())),
            self.info.clone(),
        );
        c.activate_session();
        c
    }

    fn stream_requests(&self) -> Vec<Generation> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Request::Stream(g, _) => Some(*g),
                Request::Artwork(..) => None,
            })
            .collect()
    }

    fn latest_stream(&self) -> Generation {
        *self.stream_requests().last().expect("no stream requested")
    }

    fn device<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        f(&mut self.device.lock().unwrap())
    }

    fn info(&self) -> PlaybackInfo {
        self.info.lock().unwrap().clone()
    }

    fn last_published(&self) -> NowPlaying {
        self.surface
            .borrow()
            .published
            .last()
            .cloned()
            .expect("nothing published")
    }

    fn publish_count(&self) -> usize {
        self.surface.borrow().published.len()
    }
}

fn track(id: &str, secs: u64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Title {id}"),
        category: "Ambient".to_string(),
        cover_art: String::new(),
        audio_url: format!("https://cdn.example/{id}.mp3"),
        duration: Duration::from_secs(secs),
        description: String::new(),
        color: Rgb { r: 0, g: 0, b: 0 },
        waveform: vec![1.0],
    }
}

fn deliver(rig: &Rig, c: &mut PlaybackController) {
    c.on_stream_loaded(rig.latest_stream(), Ok(b"audio".to_vec()));
}

fn playing(rig: &Rig, c: &mut PlaybackController, t: Track) {
    c.play(t);
    deliver(rig, c);
    assert_eq!(c.state(), PlayState::Playing);
}

// ---- start / toggle --------------------------------------------------------

#[test]
fn play_loads_then_plays_once_ready() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    assert_eq!(c.state(), PlayState::Loading);
    assert_eq!(rig.info().state, PlayState::Loading);
    assert_eq!(rig.info().track_id(), Some("a"));
    assert_eq!(rig.device(|d| d.attached), 0);

    deliver(&rig, &mut c);
    assert_eq!(c.state(), PlayState::Playing);
    assert!(c.is_observing());
    assert!(rig.device(|d| d.playing));
    assert_eq!(rig.last_published().rate, 1.0);
    assert_eq!(rig.last_published().title, "Title a");
}

#[test]
fn double_play_while_loading_collapses_to_one_stream() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    c.play(track("a", 69));
    assert_eq!(rig.stream_requests().len(), 1);

    deliver(&rig, &mut c);
    assert_eq!(rig.device(|d| d.attached), 1);
    assert_eq!(rig.device(|d| d.live_streams), 1);
    assert_eq!(c.state(), PlayState::Playing);
}

#[test]
fn replaying_current_track_toggles_and_keeps_position() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    rig.device(|d| d.position = Duration::from_secs(12));
    c.on_tick();
    assert_eq!(c.elapsed(), Duration::from_secs(12));

    c.play(track("a", 69));
    assert_eq!(c.state(), PlayState::Paused);
    assert!(!rig.device(|d| d.playing));
    assert_eq!(rig.last_published().rate, 0.0);

    c.play(track("a", 69));
    assert_eq!(c.state(), PlayState::Playing);
    assert_eq!(c.elapsed(), Duration::from_secs(12));
    assert_eq!(rig.device(|d| d.attached), 1);
}

#[test]
fn switching_tracks_releases_previous_stream() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));
    let first = c.generation();

    c.play(track("b", 15));
    assert_eq!(c.state(), PlayState::Loading);
    assert!(c.generation() > first);
    assert_eq!(rig.device(|d| d.live_streams), 0);
    assert!(!c.is_observing());

    deliver(&rig, &mut c);
    assert_eq!(rig.device(|d| d.live_streams), 1);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("b"));
}

#[test]
fn stale_stream_result_is_ignored() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    let stale = rig.latest_stream();
    c.play(track("b", 15));

    c.on_stream_loaded(stale, Ok(b"audio".to_vec()));
    assert_eq!(c.state(), PlayState::Loading);
    assert_eq!(rig.device(|d| d.attached), 0);

    deliver(&rig, &mut c);
    assert_eq!(rig.device(|d| d.attached), 1);
    assert_eq!(c.state(), PlayState::Playing);
}

// ---- seek ------------------------------------------------------------------

#[test]
fn clamp_seek_bounds() {
    let d = Duration::from_secs(15);
    assert_eq!(clamp_seek(40.0, d), d);
    assert_eq!(clamp_seek(-3.0, d), Duration::ZERO);
    assert_eq!(clamp_seek(f64::NAN, d), Duration::ZERO);
    assert_eq!(clamp_seek(7.5, d), Duration::from_millis(7500));
}

#[test]
fn seek_clamps_into_track_range() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("short", 15));

    c.seek(40.0);
    assert_eq!(c.elapsed(), Duration::from_secs(15));
    assert_eq!(rig.device(|d| d.position), Duration::from_secs(15));

    c.seek(-3.0);
    assert_eq!(c.elapsed(), Duration::ZERO);
    assert_eq!(rig.info().elapsed, Duration::ZERO);
}

#[test]
fn seek_while_paused_reconciles_with_settled_position() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));
    c.pause();

    rig.device(|d| d.settle_at = Some(Duration::from_millis(9500)));
    c.seek(10.0);

    assert_eq!(c.state(), PlayState::Paused);
    assert_eq!(c.elapsed(), Duration::from_millis(9500));
    assert_eq!(rig.info().elapsed, Duration::from_millis(9500));
    assert_eq!(rig.last_published().elapsed, Duration::from_millis(9500));
    assert!(!rig.device(|d| d.playing));
}

#[test]
fn seek_while_loading_applies_on_attach() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    c.seek(30.0);
    deliver(&rig, &mut c);

    assert_eq!(rig.device(|d| d.last_start_at), Some(Duration::from_secs(30)));
    assert_eq!(c.elapsed(), Duration::from_secs(30));
}

#[test]
fn seek_while_idle_does_nothing() {
    let rig = Rig::default();
    let mut c = rig.controller();
    c.seek(10.0);
    assert_eq!(c.state(), PlayState::Idle);
    assert_eq!(c.elapsed(), Duration::ZERO);
}

// ---- stop ------------------------------------------------------------------

#[test]
fn stop_is_safe_from_every_state() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.stop();
    assert_eq!(rig.surface.borrow().clears, 0);

    c.play(track("a", 69));
    let loading = rig.latest_stream();
    c.stop();
    assert_eq!(c.state(), PlayState::Idle);
    c.on_stream_loaded(loading, Ok(b"audio".to_vec()));
    assert_eq!(rig.device(|d| d.attached), 0);

    playing(&rig, &mut c, track("b", 15));
    c.stop();
    assert_eq!(rig.device(|d| d.live_streams), 0);

    playing(&rig, &mut c, track("c", 189));
    c.pause();
    c.stop();
    c.stop();

    assert_eq!(c.state(), PlayState::Idle);
    assert_eq!(c.elapsed(), Duration::ZERO);
    assert!(c.current_track().is_none());
    assert!(!c.is_observing());
    assert_eq!(rig.surface.borrow().clears, 3);
    assert_eq!(rig.info().state, PlayState::Idle);
    assert!(rig.info().track.is_none());
}

#[test]
fn ticks_after_stop_are_ignored() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));
    c.stop();

    let published = rig.publish_count();
    c.on_tick();
    c.on_tick();
    assert_eq!(rig.publish_count(), published);
    assert_eq!(c.state(), PlayState::Idle);
}

#[test]
fn tick_publishes_elapsed_while_playing() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    rig.device(|d| d.position = Duration::from_secs(80));
    c.on_tick();
    assert_eq!(rig.info().elapsed, Duration::from_secs(69));
    assert_eq!(rig.last_published().elapsed, Duration::from_secs(69));
}

#[test]
fn natural_end_returns_to_idle_and_clears_surface() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    rig.device(|d| d.finished = true);
    c.on_tick();

    assert_eq!(c.state(), PlayState::Idle);
    assert_eq!(rig.device(|d| d.live_streams), 0);
    assert_eq!(rig.surface.borrow().clears, 1);
}

#[test]
fn shutdown_fades_out_only_when_playing() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));
    c.shutdown(Duration::from_millis(300));
    assert_eq!(rig.device(|d| d.fade_outs), 1);
    assert_eq!(c.state(), PlayState::Idle);

    c.shutdown(Duration::from_millis(300));
    assert_eq!(rig.device(|d| d.fade_outs), 1);
}

// ---- failures ---------------------------------------------------------------

#[test]
fn stream_open_failure_returns_to_idle_with_error() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    c.on_stream_loaded(
        rig.latest_stream(),
        Err(PlaybackError::StreamOpenFailed("404".into())),
    );

    assert_eq!(c.state(), PlayState::Idle);
    assert_eq!(
        rig.info().last_error,
        Some(PlaybackError::StreamOpenFailed("404".into()))
    );
    assert_eq!(rig.surface.borrow().clears, 1);
}

#[test]
fn undecodable_stream_is_a_failure() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    c.on_stream_loaded(rig.latest_stream(), Ok(b"garbage".to_vec()));

    assert_eq!(c.state(), PlayState::Idle);
    assert!(matches!(
        rig.info().last_error,
        Some(PlaybackError::StreamOpenFailed(_))
    ));

    // A new track clears the error.
    c.play(track("b", 15));
    assert_eq!(rig.info().last_error, None);
}

#[test]
fn unavailable_session_gates_playback_until_reactivated() {
    let rig = Rig::default();
    rig.device(|d| d.activate_fails = true);
    let mut c = rig.controller();

    assert!(!c.session_active());
    assert!(matches!(
        rig.info().last_error,
        Some(PlaybackError::AudioSessionUnavailable(_))
    ));

    c.play(track("a", 69));
    assert_eq!(c.state(), PlayState::Idle);
    assert!(rig.requests.borrow().is_empty());

    rig.device(|d| d.activate_fails = false);
    assert!(c.activate_session());
    assert_eq!(rig.info().last_error, None);

    c.play(track("a", 69));
    assert_eq!(c.state(), PlayState::Loading);
}

#[test]
fn artwork_is_optional() {
    let rig = Rig::default();
    let mut c = rig.controller();
    let mut t = track("a", 69);
    t.cover_art = "https://cdn.example/a.jpg".to_string();

    playing(&rig, &mut c, t.clone());
    let generation = c.generation();
    assert!(
        rig.requests
            .borrow()
            .contains(&Request::Artwork(generation, t.cover_art.clone()))
    );

    c.on_artwork_loaded(
        generation,
        Err(PlaybackError::ArtworkFetchFailed("timeout".into())),
    );
    assert_eq!(c.state(), PlayState::Playing);
    assert!(rig.last_published().artwork.is_none());

    c.on_artwork_loaded(generation, Ok(vec![1, 2, 3]));
    assert_eq!(rig.last_published().artwork.as_deref(), Some(&[1u8, 2, 3][..]));
}

#[test]
fn stale_artwork_is_ignored() {
    let rig = Rig::default();
    let mut c = rig.controller();
    let mut a = track("a", 69);
    a.cover_art = "a.jpg".to_string();

    c.play(a);
    let stale = c.generation();
    playing(&rig, &mut c, track("b", 15));

    let published = rig.publish_count();
    c.on_artwork_loaded(stale, Ok(vec![9]));
    assert_eq!(rig.publish_count(), published);
}

// ---- system signals and remote controls -------------------------------------

#[test]
fn interruption_pauses_and_resumes_when_allowed() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    c.signal(SystemSignal::InterruptionBegan);
    assert_eq!(c.state(), PlayState::Paused);

    c.signal(SystemSignal::InterruptionEnded {
        resume_allowed: true,
    });
    assert_eq!(c.state(), PlayState::Playing);
    assert!(rig.device(|d| d.playing));
}

#[test]
fn interruption_without_resume_permission_stays_paused() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    c.signal(SystemSignal::InterruptionBegan);
    c.signal(SystemSignal::InterruptionEnded {
        resume_allowed: false,
    });
    assert_eq!(c.state(), PlayState::Paused);
}

#[test]
fn manual_pause_is_not_undone_by_interruption_end() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    c.pause();
    c.signal(SystemSignal::InterruptionBegan);
    c.signal(SystemSignal::InterruptionEnded {
        resume_allowed: true,
    });
    assert_eq!(c.state(), PlayState::Paused);
}

#[test]
fn interruption_while_loading_attaches_paused() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.play(track("a", 69));
    c.signal(SystemSignal::InterruptionBegan);
    deliver(&rig, &mut c);

    assert_eq!(c.state(), PlayState::Paused);
    assert!(!rig.device(|d| d.playing));
    assert!(c.is_observing());
}

#[test]
fn route_removal_pauses_and_does_not_auto_resume() {
    let rig = Rig::default();
    let mut c = rig.controller();
    playing(&rig, &mut c, track("a", 69));

    c.signal(SystemSignal::RouteRemoved);
    assert_eq!(c.state(), PlayState::Paused);

    c.signal(SystemSignal::InterruptionEnded {
        resume_allowed: true,
    });
    assert_eq!(c.state(), PlayState::Paused);
}

#[test]
fn remote_commands_follow_state() {
    let rig = Rig::default();
    let mut c = rig.controller();

    c.remote(RemoteCommand::Play);
    assert_eq!(c.state(), PlayState::Idle);

    playing(&rig, &mut c, track("a", 69));
    c.remote(RemoteCommand::Play);
    assert_eq!(c.state(), PlayState::Playing);
    c.remote(RemoteCommand::PlayPause);
    assert_eq!(c.state(), PlayState::Paused);
    c.remote(RemoteCommand::Pause);
    assert_eq!(c.state(), PlayState::Paused);
    c.remote(RemoteCommand::PlayPause);
    assert_eq!(c.state(), PlayState::Playing);
}

// ---- gestures driving the controller ----------------------------------------

struct Direct<'a>(&'a RefCell<PlaybackController>);

impl PlaybackCommands for Direct<'_> {
    fn play(&self, track: &Track) {
        self.0.borrow_mut().play(track.clone());
    }

    fn seek(&self, secs: f64) {
        self.0.borrow_mut().seek(secs);
    }
}

#[test]
fn swiping_through_catalog_keeps_one_stream() {
    let rig = Rig::default();
    let controller = RefCell::new(rig.controller());
    let tracks = vec![track("a", 69), track("b", 15), track("c", 189)];
    let mut coordinator =
        SwipeSeekCoordinator::new(tracks, Direct(&controller), GestureSettings::default());
    coordinator.set_card_width(100.0);
    coordinator.set_waveform_width(100.0);

    coordinator.play_current();
    deliver(&rig, &mut controller.borrow_mut());

    // Swipe halfway: advance to "b".
    coordinator.begin(GestureTarget::Carousel, 80.0);
    coordinator.update(50.0);
    coordinator.release(30.0);
    assert_eq!(controller.borrow().state(), PlayState::Loading);
    assert_eq!(rig.device(|d| d.live_streams), 0);
    deliver(&rig, &mut controller.borrow_mut());
    assert_eq!(rig.last_published().track_id, "b");

    // Scrub past the end of the 15 s track.
    coordinator.begin(GestureTarget::Waveform, 10.0);
    coordinator.update(90.0);
    coordinator.release(150.0);
    assert_eq!(controller.borrow().elapsed(), Duration::from_secs(15));

    // Another swipe to "c", then wrap back to "a".
    coordinator.advance();
    deliver(&rig, &mut controller.borrow_mut());
    assert_eq!(rig.info().track_id(), Some("c"));
    assert_eq!(rig.info().duration(), Duration::from_secs(189));

    coordinator.begin(GestureTarget::Carousel, 90.0);
    coordinator.release(0.0);
    deliver(&rig, &mut controller.borrow_mut());

    assert_eq!(coordinator.current_index(), 0);
    assert_eq!(rig.info().track_id(), Some("a"));
    assert_eq!(rig.device(|d| d.attached), 4);
    assert_eq!(rig.device(|d| d.live_streams), 1);
    assert_eq!(rig.stream_requests().len(), 4);
}

// ---- the audio thread ------------------------------------------------------

#[derive(Clone, Default)]
struct SharedSurface(Arc<Mutex<Vec<NowPlaying>>>);

impl NowPlayingSurface for SharedSurface {
    fn publish(&self, now_playing: &NowPlaying) {
        self.0.lock().unwrap().push(now_playing.clone());
    }

    fn clear(&self) {}
}

fn wait_for(player: &AudioPlayer, state: PlayState) -> PlaybackInfo {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let info = player.snapshot();
        if info.state == state || Instant::now() > deadline {
            return info;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn audio_thread_plays_local_file_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.ogg");
    std::fs::write(&path, b"audio").unwrap();

    let device = DeviceLog::default();
    let surface = SharedSurface::default();
    let backend_device = device.clone();
    let player = AudioPlayer::with_backend(
        move |_| FakeBackend(backend_device),
        AudioSettings {
            tick_interval_ms: 5,
            ..AudioSettings::default()
        },
        Box::new(surface.clone()),
    );

    let mut t = track("tone", 30);
    t.audio_url = path.to_string_lossy().into_owned();
    player.play(t);

    let info = wait_for(&player, PlayState::Playing);
    assert_eq!(info.state, PlayState::Playing);
    assert_eq!(device.lock().unwrap().attached, 1);
    assert!(!surface.0.lock().unwrap().is_empty());

    player.quit_softly(Duration::from_millis(0));
    assert_eq!(player.snapshot().state, PlayState::Idle);
    assert_eq!(device.lock().unwrap().live_streams, 0);
}

#[test]
fn audio_thread_reports_missing_file() {
    let device = DeviceLog::default();
    let backend_device = device.clone();
    let player = AudioPlayer::with_backend(
        move |_| FakeBackend(backend_device),
        AudioSettings::default(),
        Box::new(SharedSurface::default()),
    );

    let mut t = track("gone", 30);
    t.audio_url = "file:///definitely/not/here.mp3".to_string();
    player.play(t);

    let deadline = Instant::now() + Duration::from_secs(5);
    while player.snapshot().last_error.is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let info = player.snapshot();
    assert_eq!(info.state, PlayState::Idle);
    assert!(matches!(
        info.last_error,
        Some(PlaybackError::StreamOpenFailed(_))
    ));

    player.quit_softly(Duration::ZERO);
}

#[test]
fn audio_thread_pauses_on_route_removal_and_reopens_device() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.ogg");
    std::fs::write(&path, b"audio").unwrap();

    let device = DeviceLog::default();
    let backend_device = device.clone();
    let player = AudioPlayer::with_backend(
        move |_| FakeBackend(backend_device),
        AudioSettings {
            tick_interval_ms: 5,
            session_retry_ms: 10,
            ..AudioSettings::default()
        },
        Box::new(SharedSurface::default()),
    );

    let mut t = track("tone", 30);
    t.audio_url = path.to_string_lossy().into_owned();
    player.play(t);
    assert_eq!(wait_for(&player, PlayState::Playing).state, PlayState::Playing);

    // The output device goes away under a playing stream.
    device.lock().unwrap().active = false;
    player.signal(SystemSignal::RouteRemoved);
    assert_eq!(wait_for(&player, PlayState::Paused).state, PlayState::Paused);
    assert!(!device.lock().unwrap().playing);

    // The retry loop reopens it, but playback stays paused.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !device.lock().unwrap().active && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(device.lock().unwrap().active);
    assert_eq!(player.snapshot().state, PlayState::Paused);

    player.remote(RemoteCommand::Play);
    assert_eq!(wait_for(&player, PlayState::Playing).state, PlayState::Playing);
    assert!(device.lock().unwrap().playing);

    player.quit_softly(Duration::ZERO);
}

#[test]
fn lost_output_device_posts_one_route_removal() {
    use super::sink::device_error_handler;
    use rodio::cpal;
    use std::sync::atomic::{AtomicBool, Ordering};

    let (tx, rx) = std::sync::mpsc::channel();
    let lost = Arc::new(AtomicBool::new(false));
    let mut on_error = device_error_handler(lost.clone(), tx);

    on_error(cpal::StreamError::BackendSpecific {
        err: cpal::BackendSpecificError {
            description: "buffer underrun".into(),
        },
    });
    assert!(!lost.load(Ordering::SeqCst));
    assert!(rx.try_recv().is_err());

    on_error(cpal::StreamError::DeviceNotAvailable);
    on_error(cpal::StreamError::DeviceNotAvailable);
    assert!(lost.load(Ordering::SeqCst));
    assert!(matches!(
        rx.try_recv(),
        Ok(AudioCmd::Signal(SystemSignal::RouteRemoved))
    ));
    assert!(rx.try_recv().is_err());
}
