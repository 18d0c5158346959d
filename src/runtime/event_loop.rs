use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::{App, HitAreas};
use crate::audio::{AudioPlayer, PlayState, RemoteCommand};
use crate::config;
use crate::mpris::ControlCmd;
use crate::ui;

type PlayerApp = App<Arc<AudioPlayer>>;

/// Main terminal event loop: handles input, UI drawing and remote control
/// commands. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut PlayerApp,
    audio_player: &AudioPlayer,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let mut areas = HitAreas::default();
        terminal.draw(|f| {
            areas = ui::draw(f, app, &settings.ui, settings.gesture.scrub_seconds);
        })?;
        app.set_hit_areas(areas);

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, audio_player) {
                return Ok(());
            }
        }

        // Short poll so drags and the waveform fill stay smooth.
        if event::poll(Duration::from_millis(30))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(key, settings, app, audio_player, control_tx) {
                        break;
                    }
                }
                Event::Mouse(mouse) => handle_mouse_event(mouse, app),
                _ => {}
            }
        }
    }

    Ok(())
}

/// Apply one remote or keyboard control. Returns `true` on quit.
fn handle_control_cmd(
    cmd: ControlCmd,
    settings: &config::Settings,
    app: &mut PlayerApp,
    audio_player: &AudioPlayer,
) -> bool {
    let state = audio_player.snapshot().state;
    match cmd {
        ControlCmd::Quit => {
            audio_player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        // Nothing loaded: start the track under the card.
        ControlCmd::Play | ControlCmd::PlayPause if state == PlayState::Idle => app.play_pause(),
        ControlCmd::Play => audio_player.remote(RemoteCommand::Play),
        ControlCmd::PlayPause => audio_player.remote(RemoteCommand::PlayPause),
        ControlCmd::Pause => audio_player.remote(RemoteCommand::Pause),
        ControlCmd::Stop => audio_player.stop(),
        ControlCmd::Next => {
            app.next();
        }
        ControlCmd::Prev => {
            app.prev();
        }
        ControlCmd::SeekBy(secs) => audio_player.seek_by(secs),
        ControlCmd::SetPosition(secs) => audio_player.seek(secs),
    }
    false
}

/// Returns `true` on quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut PlayerApp,
    audio_player: &AudioPlayer,
    control_tx: &mpsc::Sender<ControlCmd>,
) -> bool {
    let scrub = settings.gesture.scrub_seconds as f64;
    match key.code {
        KeyCode::Char('q') => {
            audio_player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('s') => {
            let _ = control_tx.send(ControlCmd::Stop);
        }
        KeyCode::Char('l') | KeyCode::Char('n') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') | KeyCode::Right => audio_player.seek_by(scrub),
        KeyCode::Char('H') | KeyCode::Left => audio_player.seek_by(-scrub),
        KeyCode::Char('d') => app.toggle_description(),
        KeyCode::Esc => app.coordinator.cancel(),
        _ => {}
    }
    false
}

fn handle_mouse_event(mouse: MouseEvent, app: &mut PlayerApp) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column),
        MouseEventKind::Up(MouseButton::Left) => {
            if let Some(outcome) = app.mouse_up(mouse.column) {
                debug!(?outcome, "mouse gesture");
            }
        }
        _ => {}
    }
}
