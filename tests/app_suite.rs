use crossterm::event::{KeyCode, KeyModifiers};
use laser_visualizer::app::{
    handle_key, song_position, stopwatch_time, toggle_playback, track_status, KeyAction, Layout,
};
use laser_visualizer::config::{Config, RendererMode};
use laser_visualizer::hud::TrackStatus;
use laser_visualizer::track::Transport;

#[derive(Default)]
struct FakeTransport {
    loaded: bool,
    playing: bool,
    position: f32,
}

impl Transport for FakeTransport {
    fn is_loaded(&self) -> bool {
        self.loaded
    }
    fn is_playing(&self) -> bool {
        self.playing
    }
    fn play(&mut self) {
        self.playing = true;
    }
    fn pause(&mut self) {
        self.playing = false;
    }
    fn current_time(&self) -> f32 {
        self.position
    }
}

#[test]
fn keys_map_to_actions() {
    let none = KeyModifiers::NONE;
    assert_eq!(handle_key(KeyCode::Char(' '), none), KeyAction::TogglePlayback);
    assert_eq!(handle_key(KeyCode::Char('q'), none), KeyAction::Quit);
    assert_eq!(handle_key(KeyCode::Esc, none), KeyAction::Quit);
    assert_eq!(handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL), KeyAction::Quit);
    assert_eq!(handle_key(KeyCode::Char('c'), none), KeyAction::None);
    assert_eq!(handle_key(KeyCode::Char('i'), none), KeyAction::ToggleHud);
    assert_eq!(handle_key(KeyCode::Enter, none), KeyAction::None);
}

#[test]
fn layout_reserves_hud_row() {
    let l = Layout::compute((80, 24), true, (1, 2));
    assert_eq!((l.visual_rows, l.hud_rows), (23, 1));
    assert_eq!((l.pixel_width, l.pixel_height), (80, 46));

    let l = Layout::compute((80, 24), false, (2, 4));
    assert_eq!((l.visual_rows, l.hud_rows), (24, 0));
    assert_eq!((l.pixel_width, l.pixel_height), (160, 96));

    let l = Layout::compute((10, 1), true, (1, 2));
    assert_eq!((l.visual_rows, l.hud_rows), (1, 0));
}

#[test]
fn schedule_clock_prefers_playing_track() {
    let playing = FakeTransport {
        loaded: true,
        playing: true,
        position: 12.5,
    };
    let paused = FakeTransport {
        playing: false,
        ..playing
    };
    assert_eq!(song_position(Some(&playing), 99.0), 12.5);
    assert_eq!(song_position(Some(&paused), 99.0), 99.0);
    assert_eq!(song_position(None, 3.25), 3.25);
}

#[test]
fn stopwatch_shows_track_position_once_loaded() {
    let paused = FakeTransport {
        loaded: true,
        playing: false,
        position: 4.0,
    };
    let loading = FakeTransport::default();
    assert_eq!(stopwatch_time(Some(&paused), 50.0), 4.0);
    assert_eq!(stopwatch_time(Some(&loading), 50.0), 50.0);
    assert_eq!(stopwatch_time(None, 7.0), 7.0);
}

#[test]
fn toggle_ignored_until_loaded() {
    let mut t = FakeTransport::default();
    assert!(!toggle_playback(Some(&mut t)));
    assert!(!t.playing);

    t.loaded = true;
    assert!(toggle_playback(Some(&mut t)));
    assert!(t.playing);
    assert!(toggle_playback(Some(&mut t)));
    assert!(!t.playing);

    assert!(!toggle_playback(None));
}

#[test]
fn status_reflects_transport() {
    let mut t = FakeTransport::default();
    assert_eq!(track_status(None, false), TrackStatus::NoTrack);
    assert_eq!(track_status(Some(&t), false), TrackStatus::Loading);
    assert_eq!(track_status(Some(&t), true), TrackStatus::Failed);
    t.loaded = true;
    assert_eq!(track_status(Some(&t), false), TrackStatus::Paused);
    t.playing = true;
    assert_eq!(track_status(Some(&t), false), TrackStatus::Playing);
}

#[test]
fn config_defaults_and_validation() {
    use clap::Parser;

    let cfg = Config::try_parse_from(["laser-visualizer"]).unwrap();
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.fps, 60);
    assert_eq!(cfg.stars, 200);
    assert_eq!(cfg.lasers_per_anchor, 18);
    assert!(cfg.sync_updates);
    assert!(cfg.track.is_none() && cfg.seed.is_none());

    let cfg = Config::try_parse_from([
        "laser-visualizer",
        "--renderer",
        "hires",
        "--seed",
        "7",
        "--sync-updates",
        "false",
    ])
    .unwrap();
    assert_eq!(cfg.renderer, RendererMode::Braille);
    assert_eq!(cfg.seed, Some(7));
    assert!(!cfg.sync_updates);

    assert!(Config::try_parse_from(["laser-visualizer", "--lasers-per-anchor", "0"]).is_err());
}
