mod canvas;
mod lasers;
mod modes;
mod starfield;

use crate::audio::AudioFeatures;
use crate::schedule::{ModeSchedule, ModeTransition};

pub use canvas::{Blend, Canvas, Rgb, Stroke};
pub use lasers::{
    activation_probability, build_anchors, fan_fraction, glow_layers, Anchor, Beam, BeamPose, Edge,
    FAN_SPREAD, GLOW_LAYERS,
};
pub use modes::{drift, AnimationMode, BeamSample};
pub use starfield::{Star, Starfield};

/// Screen fade per frame (0..255 alpha of black) behind the star layer.
const SCREEN_FADE: f32 = 30.0 / 255.0;
/// Laser layer fade per frame; lower keeps longer after-images.
const TRAIL_FADE: f32 = 40.0 / 255.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisualizerSettings {
    pub stars: usize,
    pub lasers_per_anchor: usize,
    pub seed: Option<u64>,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            stars: 200,
            lasers_per_anchor: 18,
            seed: None,
        }
    }
}

/// What the outside world tells the visualizer each frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    /// Track position, or wall-clock seconds when nothing is playing.
    pub song_time_s: f32,
    /// Wall-clock seconds since start; drives mode crossfades.
    pub wall_time_s: f64,
    pub audio: AudioFeatures,
}

/// All animation state: stars, laser anchors, the mode crossfade and the layers they draw into.
pub struct VisualizerState {
    schedule: ModeSchedule,
    transition: ModeTransition,
    starfield: Starfield,
    anchors: Vec<Anchor>,
    lasers_per_anchor: usize,
    frame: u64,
    lit_beams: usize,
    rng: fastrand::Rng,
    screen: Canvas,
    star_layer: Canvas,
    laser_layer: Canvas,
    stroke_scale: f32,
}

impl VisualizerState {
    pub fn new(settings: VisualizerSettings, schedule: ModeSchedule, w: usize, h: usize) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let starfield = Starfield::generate(settings.stars, w, h, &mut rng);
        let mut state = Self {
            schedule,
            transition: ModeTransition::default(),
            starfield,
            anchors: Vec::new(),
            lasers_per_anchor: settings.lasers_per_anchor.max(1),
            frame: 0,
            lit_beams: 0,
            rng,
            screen: Canvas::new(0, 0),
            star_layer: Canvas::new(0, 0),
            laser_layer: Canvas::new(0, 0),
            stroke_scale: 1.0,
        };
        state.resize(w, h);
        state
    }

    /// Rebuilds every size-dependent resource. Stars keep their positions.
    pub fn resize(&mut self, w: usize, h: usize) {
        self.stroke_scale = stroke_scale(w, h);
        self.screen.resize(w, h);
        self.laser_layer.resize(w, h);
        self.star_layer.resize(w, h);
        self.starfield.render(&mut self.star_layer, self.stroke_scale);
        self.anchors = build_anchors(w, h, self.lasers_per_anchor, &mut self.rng);
        log::debug!(
            "visualizer resized to {w}x{h} ({} anchors, stroke scale {:.2})",
            self.anchors.len(),
            self.stroke_scale
        );
    }

    /// Advances every beam one frame and composites the result. Returns RGBA pixels.
    pub fn render_frame(&mut self, input: &FrameInput) -> &[u8] {
        let audio = input.audio.sanitized();
        let energies = [audio.bass, audio.mid, audio.treble];

        self.screen.fade(Rgb::BLACK, SCREEN_FADE);
        let star_alpha = (200.0 + audio.level * 55.0) / 255.0;
        self.screen.composite(&self.star_layer, Blend::Alpha, star_alpha);

        self.laser_layer.fade(Rgb::BLACK, TRAIL_FADE);

        let scheduled = self.schedule.resolve(input.song_time_s);
        if self.transition.update(scheduled, input.wall_time_s) {
            log::info!(
                "mode {} -> {} at song time {:.2}s",
                self.transition.previous(),
                self.transition.current(),
                input.song_time_s
            );
        }

        let ox = self.laser_layer.width() as f32 * 0.5;
        let oy = self.laser_layer.height() as f32 * 0.5;
        let mut lit = 0usize;
        for (i, anchor) in self.anchors.iter_mut().enumerate() {
            let energy = energies[i % energies.len()];
            let count = anchor.beams.len();
            let origin = (anchor.x, anchor.y);
            let from = (ox + origin.0, oy + origin.1);
            for (j, beam) in anchor.beams.iter_mut().enumerate() {
                let pose = beam.step(
                    j,
                    count,
                    origin,
                    energy,
                    &self.transition,
                    self.frame,
                    &mut self.rng,
                );
                lit += pose.active as usize;
                let to = (ox + pose.end.0, oy + pose.end.1);
                for stroke in glow_layers(anchor.color, pose.active, energy, self.stroke_scale) {
                    self.laser_layer.stroke_segment(from, to, &stroke);
                }
            }
        }
        self.lit_beams = lit;

        self.screen.composite(&self.laser_layer, Blend::Add, 1.0);
        self.frame += 1;
        self.screen.pixels()
    }

    pub fn pixels(&self) -> &[u8] {
        self.screen.pixels()
    }

    pub fn screen(&self) -> &Canvas {
        &self.screen
    }

    pub fn width(&self) -> usize {
        self.screen.width()
    }

    pub fn height(&self) -> usize {
        self.screen.height()
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    pub fn transition(&self) -> &ModeTransition {
        &self.transition
    }

    /// Frames rendered so far; also the `t` fed to the offset functions.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Beams that were switched on in the last frame.
    pub fn lit_beams(&self) -> usize {
        self.lit_beams
    }
}

/// Line widths and glow radii are tuned for a ~720 px tall canvas.
pub fn stroke_scale(w: usize, h: usize) -> f32 {
    (w.min(h) as f32 / 720.0).clamp(0.35, 1.0)
}
