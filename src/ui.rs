//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`: the
//! song carousel, the waveform scrubber, a status line and the controls.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap},
};
use std::time::{Duration, Instant};

use crate::app::{App, HitAreas};
use crate::audio::{PlayState, PlaybackInfo};
use crate::catalog::{Rgb, Track};
use crate::config::{TimeField, UiSettings};
use crate::gesture::{Feedback, PlaybackCommands};

const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    [
        "[drag card ←] next song".to_string(),
        "[drag waveform] seek".to_string(),
        "[space/p] play/pause".to_string(),
        "[h/l] prev/next".to_string(),
        format!("[H/L] scrub -/+{scrub_seconds}s"),
        "[s] stop".to_string(),
        "[d] details".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the time text (elapsed/total/remaining) per `UiSettings`.
fn time_text(elapsed: Duration, total: Duration, ui: &UiSettings) -> Option<String> {
    let parts: Vec<String> = ui
        .time_fields
        .iter()
        .map(|f| match f {
            TimeField::Elapsed => format_mmss(elapsed),
            TimeField::Total => format_mmss(total),
            TimeField::Remaining => format!("-{}", format_mmss(total.saturating_sub(elapsed))),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.time_separator))
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn state_icon(state: PlayState) -> &'static str {
    match state {
        PlayState::Idle => "■",
        PlayState::Loading => "…",
        PlayState::Playing => "▶",
        PlayState::Paused => "⏸",
    }
}

/// One glyph per bar, `bars` already normalized to `[0, 1]`.
fn waveform_glyphs(bars: &[f32]) -> Vec<char> {
    let top = (BAR_GLYPHS.len() - 1) as f32;
    bars.iter()
        .map(|b| BAR_GLYPHS[(b.clamp(0.0, 1.0) * top).round() as usize])
        .collect()
}

/// Shift `base` horizontally by `dx` and clip it to `bounds`.
fn shifted(base: Rect, dx: i32, bounds: Rect) -> Option<Rect> {
    let x = base.x as i32 + dx;
    let left = x.max(bounds.x as i32);
    let right = (x + base.width as i32).min(bounds.right() as i32);
    if right <= left {
        return None;
    }
    Some(Rect::new(left as u16, base.y, (right - left) as u16, base.height))
}

fn card<'a>(track: &'a Track, show_description: bool) -> Paragraph<'a> {
    let accent = color(track.color);
    let mut lines = vec![
        Line::from(track.title.as_str().bold()),
        Line::from(Span::styled(
            track.category.as_str(),
            Style::default().fg(accent),
        )),
        Line::from(format_mmss(track.duration)),
    ];
    if show_description && !track.description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(track.description.as_str().italic()));
    }

    Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .padding(Padding::horizontal(1)),
    )
}

/// Render the carousel. Returns the resting card area used for hit testing.
fn draw_carousel<P: PlaybackCommands>(frame: &mut Frame, app: &App<P>, area: Rect) -> Rect {
    let block = Block::default().borders(Borders::ALL).title(" songs ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let tracks = app.tracks();
    let Some(current) = app.current_track() else {
        frame.render_widget(
            Paragraph::new("catalog is empty").alignment(Alignment::Center),
            inner,
        );
        return Rect::default();
    };

    // Rests one cell in from the left border.
    let card_width = (inner.width * 3 / 4)
        .max(10)
        .min(inner.width.saturating_sub(1));
    let resting = Rect::new(inner.x + 1, inner.y, card_width, inner.height);
    let swipe = app.coordinator.swipe_progress().unwrap_or(0.0);
    let dx = (swipe * card_width as f32).round() as i32;

    if let Some(r) = shifted(resting, dx, inner) {
        frame.render_widget(Clear, r);
        frame.render_widget(card(current, app.show_description), r);
    }

    // The next card peeks in from the right.
    if tracks.len() > 1 {
        let next = &tracks[(app.coordinator.current_index() + 1) % tracks.len()];
        let gap = card_width as i32 + 2;
        if let Some(r) = shifted(resting, dx + gap, inner) {
            frame.render_widget(Clear, r);
            frame.render_widget(card(next, false).dim(), r);
        }
    }

    resting
}

/// Render the waveform. Returns the strip used for hit testing.
fn draw_waveform<P: PlaybackCommands>(
    frame: &mut Frame,
    app: &App<P>,
    info: &PlaybackInfo,
    area: Rect,
) -> Rect {
    let block = Block::default().borders(Borders::ALL).title(" waveform ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(track) = app.current_track() else {
        return Rect::default();
    };
    let strip = Rect::new(inner.x, inner.y, inner.width, inner.height.min(1));

    // A scrub in flight shows its speculative position; otherwise follow playback.
    let progress = app.coordinator.scrub_progress().map(f64::from).unwrap_or_else(|| {
        if app.is_current_loaded(info) {
            info.progress()
        } else {
            0.0
        }
    });
    let filled = (progress * strip.width as f64).round() as usize;

    let accent = color(track.color);
    let spans: Vec<Span> = waveform_glyphs(&track.waveform_bars(strip.width as usize))
        .into_iter()
        .enumerate()
        .map(|(i, glyph)| {
            let style = if i < filled {
                Style::default().fg(accent)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(glyph.to_string(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), strip);

    strip
}

fn status_line<P: PlaybackCommands>(
    app: &App<P>,
    info: &PlaybackInfo,
    ui: &UiSettings,
) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(" {} ", state_icon(info.state)))];

    match info.track.as_ref() {
        Some(track) => {
            spans.push(Span::raw(track.title.clone()));
            if let Some(time) = time_text(info.elapsed, info.duration(), ui) {
                spans.push(Span::raw(format!(" [{time}]")));
            }
        }
        None => spans.push(Span::raw("Stopped")),
    }

    match app.active_flash(Instant::now()) {
        Some(Feedback::Tick) => spans.push(Span::raw(" •")),
        Some(Feedback::Commit) => spans.push(Span::raw(" ◆").bold()),
        None => {}
    }

    if let Some(err) = info.last_error.as_ref() {
        spans.push(Span::raw(" • "));
        spans.push(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        ));
    }

    if let Some(source) = app.catalog_source.as_ref() {
        spans.push(Span::raw(format!(" • Catalog: {source}")));
    }

    Line::from(spans)
}

/// Render the entire UI into the provided `frame`. Returns the hit areas
/// for mouse gestures.
pub fn draw<P: PlaybackCommands>(
    frame: &mut Frame,
    app: &App<P>,
    ui_settings: &UiSettings,
    scrub_seconds: u64,
) -> HitAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" encore ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let info = app.playback();
    let card = draw_carousel(frame, app, chunks[1]);
    let waveform = draw_waveform(frame, app, &info, chunks[2]);

    let status = Paragraph::new(status_line(app, &info, ui_settings))
        .block(Block::bordered().title(" status "));
    frame.render_widget(status, chunks[3]);

    let footer = Paragraph::new(controls_text(scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding::left(1)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);

    HitAreas { card, waveform }
}
