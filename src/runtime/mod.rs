use std::env;
use std::path::Path;
use std::sync::{Arc, mpsc};

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::catalog;
use crate::gesture::SwipeSeekCoordinator;
use crate::logging;
use crate::mpris::{ControlCmd, spawn_mpris};

mod event_loop;
mod settings;

/// Catalog used when none is given on the command line.
const DEFAULT_CATALOG: &str = "catalog.toml";

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_problem) = settings::load_settings();
    let log_file = logging::init(&settings.log);
    if let Some(problem) = settings_problem {
        warn!("{problem}");
    }
    info!("encore starting, {}", logging::describe(log_file.as_deref()));

    let source = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CATALOG.to_string());
    let tracks = catalog::load(Path::new(&source), &settings.catalog)?;
    info!(tracks = tracks.len(), %source, "catalog loaded");

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = spawn_mpris(control_tx.clone());

    let audio_player = Arc::new(AudioPlayer::new(settings.audio.clone(), Box::new(mpris)));
    let coordinator =
        SwipeSeekCoordinator::new(tracks, audio_player.clone(), settings.gesture.clone());
    let mut app = App::new(coordinator);
    app.set_playback_handle(audio_player.playback_handle());
    app.set_catalog_source(source);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &audio_player,
        &control_tx,
        &control_rx,
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    run_result
}
