use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "laser-visualizer", version, about = "Audio-reactive laser and starfield visualizer for the terminal")]
pub struct Config {
    /// WAV file to play and analyze. Without it the show runs on the wall clock.
    #[arg(long, value_name = "WAV")]
    pub track: Option<PathBuf>,

    /// Mode schedule file (`<time> <mode>` per line). Defaults to the built-in table.
    #[arg(long, value_name = "FILE")]
    pub schedule: Option<PathBuf>,

    /// Output device name (case-insensitive substring match).
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for stars, beams and beam activation. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 200)]
    pub stars: usize,

    #[arg(long, default_value_t = 18, value_parser = clap::value_parser!(u16).range(1..))]
    pub lasers_per_anchor: u16,

    /// Start playback as soon as the track has loaded.
    #[arg(long, default_value_t = false)]
    pub autoplay: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    /// Write logs here (the terminal is in raw mode while running).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
}

impl RendererMode {
    /// Framebuffer pixels per terminal cell (columns, rows).
    pub fn cell_pixels(self) -> (usize, usize) {
        match self {
            Self::HalfBlock => (1, 2),
            Self::Braille => (2, 4),
        }
    }
}
