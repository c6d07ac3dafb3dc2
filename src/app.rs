use crate::audio::AtomicAudioFeatures;
use crate::config::Config;
use crate::hud::{build_hud_line, format_stopwatch, FpsCounter, TrackStatus};
use crate::render::{make_renderer, Frame};
use crate::schedule::ModeSchedule;
use crate::terminal::TerminalGuard;
use crate::track::{Track, Transport};
use crate::visual::{FrameInput, VisualizerSettings, VisualizerState};
use anyhow::Context;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    TogglePlayback,
    ToggleHud,
    None,
}

/// Terminal cells split into the visual area and the HUD row, plus the framebuffer size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub visual_rows: u16,
    pub hud_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
}

impl Layout {
    pub fn compute(size: (u16, u16), show_hud: bool, cell_px: (usize, usize)) -> Self {
        let (cols, rows) = size;
        let hud_rows = if show_hud && rows > 1 { 1 } else { 0 };
        let visual_rows = rows.saturating_sub(hud_rows).max(1);
        Self {
            cols,
            rows,
            visual_rows,
            hud_rows,
            pixel_width: (cols as usize).saturating_mul(cell_px.0),
            pixel_height: (visual_rows as usize).saturating_mul(cell_px.1),
        }
    }
}

pub fn init_logging(cfg: &Config) -> anyhow::Result<()> {
    let default_filter = if cfg.log_file.is_some() { "info" } else { "error" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = &cfg.log_file {
        let file = File::create(path)
            .with_context(|| format!("create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("initialise logger")?;
    Ok(())
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let schedule = match &cfg.schedule {
        Some(path) => ModeSchedule::load(path)
            .with_context(|| format!("load mode schedule {}", path.display()))?,
        None => ModeSchedule::default(),
    };
    log::info!("mode schedule: {} entries", schedule.entries().len());

    // A missing device or unreadable track degrades to the wall clock instead of aborting.
    let mut track = match &cfg.track {
        Some(path) => match Track::open(path, cfg.device.as_deref()) {
            Ok(t) => Some(t),
            Err(err) => {
                log::error!("audio disabled: {err:#}");
                None
            }
        },
        None => None,
    };
    let features = track
        .as_ref()
        .map(Track::features)
        .unwrap_or_else(|| Arc::new(AtomicAudioFeatures::new()));

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = make_renderer(cfg.renderer);
    let cell_px = cfg.renderer.cell_pixels();

    let mut term_size = crossterm::terminal::size().context("get terminal size")?;
    if term_size.1 < 2 || term_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            term_size.0,
            term_size.1
        ));
    }

    let mut show_hud = true;
    let mut layout = Layout::compute(term_size, show_hud, cell_px);
    let settings = VisualizerSettings {
        stars: cfg.stars,
        lasers_per_anchor: cfg.lasers_per_anchor as usize,
        seed: cfg.seed,
    };
    let mut state =
        VisualizerState::new(settings, schedule, layout.pixel_width, layout.pixel_height);

    let start = Instant::now();
    let mut fps = FpsCounter::new();
    let mut autoplay_pending = cfg.autoplay && track.is_some();

    loop {
        let now = Instant::now();
        let mut relayout = false;

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => match handle_key(k.code, k.modifiers) {
                    KeyAction::Quit => return Ok(()),
                    KeyAction::TogglePlayback => {
                        toggle_playback(track.as_mut().map(|t| t as &mut dyn Transport));
                    }
                    KeyAction::ToggleHud => {
                        show_hud = !show_hud;
                        relayout = true;
                    }
                    KeyAction::None => {}
                },
                Event::Mouse(m) if matches!(m.kind, MouseEventKind::Down(MouseButton::Left)) => {
                    toggle_playback(track.as_mut().map(|t| t as &mut dyn Transport));
                }
                Event::Resize(c, r) => {
                    term_size = (c, r);
                    relayout = true;
                }
                _ => {}
            }
        }

        // Size check once per frame (resize events can be missed in some terminals).
        let sz = crossterm::terminal::size()?;
        if sz != term_size {
            term_size = sz;
            relayout = true;
        }
        if relayout {
            let next = Layout::compute(term_size, show_hud, cell_px);
            if (next.pixel_width, next.pixel_height) != (layout.pixel_width, layout.pixel_height) {
                log::info!("resize to {}x{} cells", next.cols, next.rows);
                state.resize(next.pixel_width, next.pixel_height);
            }
            layout = next;
        }

        if autoplay_pending {
            if let Some(t) = track.as_mut() {
                if t.is_loaded() {
                    t.play();
                    autoplay_pending = false;
                } else if t.load_failed() {
                    autoplay_pending = false;
                }
            }
        }

        let wall_s = now.duration_since(start).as_secs_f64();
        let transport = track.as_ref().map(|t| t as &dyn Transport);
        let input = FrameInput {
            song_time_s: song_position(transport, wall_s),
            wall_time_s: wall_s,
            audio: features.load(),
        };
        state.render_frame(&input);

        let status = track_status(transport, track.as_ref().is_some_and(Track::load_failed));
        let hud = if show_hud {
            build_hud_line(layout.cols as usize, state.transition(), status, fps.fps())
        } else {
            String::new()
        };
        let stopwatch = format_stopwatch(stopwatch_time(transport, wall_s));

        let frame = Frame {
            term_cols: layout.cols,
            term_rows: layout.rows,
            visual_rows: layout.visual_rows,
            pixel_width: state.width(),
            pixel_height: state.height(),
            pixels_rgba: state.pixels(),
            hud: &hud,
            hud_rows: layout.hud_rows,
            stopwatch: Some(&stopwatch),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;
        fps.tick();

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

pub fn handle_key(code: KeyCode, mods: KeyModifiers) -> KeyAction {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return KeyAction::Quit;
    }
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char(' ') => KeyAction::TogglePlayback,
        KeyCode::Char('i') | KeyCode::Char('I') => KeyAction::ToggleHud,
        _ => KeyAction::None,
    }
}

/// Play/pause if there is a loaded track; silently ignored otherwise.
pub fn toggle_playback(transport: Option<&mut dyn Transport>) -> bool {
    let Some(t) = transport else {
        return false;
    };
    let toggled = t.toggle();
    if toggled {
        log::info!(
            "{} at {:.3}s",
            if t.is_playing() { "play" } else { "pause" },
            t.current_time()
        );
    } else {
        log::debug!("toggle ignored: track not loaded");
    }
    toggled
}

/// Position that drives the mode schedule: the track while it plays, the wall clock otherwise.
pub fn song_position(transport: Option<&dyn Transport>, wall_s: f64) -> f32 {
    match transport {
        Some(t) if t.is_loaded() && t.is_playing() => t.current_time(),
        _ => wall_s as f32,
    }
}

/// Time shown in the stopwatch box: the track position once loaded (even paused).
pub fn stopwatch_time(transport: Option<&dyn Transport>, wall_s: f64) -> f32 {
    match transport {
        Some(t) if t.is_loaded() => t.current_time(),
        _ => wall_s as f32,
    }
}

pub fn track_status(transport: Option<&dyn Transport>, load_failed: bool) -> TrackStatus {
    match transport {
        None => TrackStatus::NoTrack,
        Some(_) if load_failed => TrackStatus::Failed,
        Some(t) if !t.is_loaded() => TrackStatus::Loading,
        Some(t) if t.is_playing() => TrackStatus::Playing,
        Some(_) => TrackStatus::Paused,
    }
}
