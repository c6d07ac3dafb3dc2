use crate::schedule::ModeTransition;
use std::time::Instant;

pub const INSTRUCTIONS: &str = "Click or press SPACE to play / pause";

/// `mm:ss.mmm`; negative or non-finite input shows as zero.
pub fn format_stopwatch(secs: f32) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "00:00.000".to_string();
    }
    let total_ms = (secs as f64 * 1000.0).floor() as u64;
    let m = total_ms / 60_000;
    let s = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{m:02}:{s:02}.{ms:03}")
}

/// Playback state shown next to the instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
    NoTrack,
    Loading,
    Failed,
    Paused,
    Playing,
}

impl TrackStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoTrack => "no track",
            Self::Loading => "loading",
            Self::Failed => "load failed",
            Self::Paused => "paused",
            Self::Playing => "playing",
        }
    }
}

/// Single bottom row: instructions, mode (with crossfade progress) and FPS, clipped to `cols`.
pub fn build_hud_line(
    cols: usize,
    transition: &ModeTransition,
    status: TrackStatus,
    fps: f32,
) -> String {
    let mode = if transition.is_blending() {
        format!(
            "{} -> {} {:>3.0}%",
            transition.previous(),
            transition.current(),
            transition.fraction() * 100.0
        )
    } else {
        transition.current().to_string()
    };
    let line = format!(
        "{INSTRUCTIONS} | {} | Mode: {mode} | FPS: {fps:>4.1}",
        status.label()
    );
    line.chars().take(cols).collect()
}

pub struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
