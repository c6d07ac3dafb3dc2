use crate::schedule::ModeTransition;
use crate::visual::canvas::{Rgb, Stroke};
use crate::visual::modes::BeamSample;
use crate::visual::starfield::{map_range, rand_range};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Total opening angle of one anchor's fan.
pub const FAN_SPREAD: f32 = PI * 0.45;
pub const GLOW_LAYERS: usize = 3;

const ANCHOR_X_FRACTIONS: [f32; 3] = [-0.3, 0.0, 0.3];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Bottom,
    Top,
}

impl Edge {
    /// Direction of the middle beam: straight up from the bottom, down from the top.
    pub fn base_angle(self) -> f32 {
        match self {
            Self::Bottom => -FRAC_PI_2,
            Self::Top => FRAC_PI_2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beam {
    pub angle_base: f32,
    pub len_base: f32,
    pub speed: f32,
    pub seed: f32,
    pub phase: f32,
    pub flicker: f32,
}

/// Where one beam lands this frame, in centred coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamPose {
    pub angle: f32,
    pub len: f32,
    pub end: (f32, f32),
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub edge: Edge,
    pub color: Rgb,
    pub beams: Vec<Beam>,
}

/// Three bottom anchors and their mirrored top twins, interleaved bottom/top per column.
pub fn build_anchors(w: usize, h: usize, per_anchor: usize, rng: &mut fastrand::Rng) -> Vec<Anchor> {
    let (wf, hf) = (w as f32, h as f32);
    let len_base = wf.min(hf) * 0.9;
    let per_anchor = per_anchor.max(1);

    let mut anchors = Vec::with_capacity(ANCHOR_X_FRACTIONS.len() * 2);
    for fx in ANCHOR_X_FRACTIONS {
        for (edge, y) in [(Edge::Bottom, hf * 0.5), (Edge::Top, -hf * 0.5)] {
            let beams = (0..per_anchor)
                .map(|j| Beam {
                    angle_base: edge.base_angle() + (fan_fraction(j, per_anchor) - 0.5) * FAN_SPREAD,
                    len_base,
                    speed: rand_range(rng, 0.004, 0.01),
                    seed: rand_range(rng, 0.0, 1000.0),
                    phase: rand_range(rng, 0.0, TAU),
                    flicker: rng.f32(),
                })
                .collect();
            anchors.push(Anchor {
                x: wf * fx,
                y,
                edge,
                color: Rgb::WHITE,
                beams,
            });
        }
    }
    anchors
}

/// Position of beam `index` across its fan in [0, 1]; a lone beam sits in the middle.
pub fn fan_fraction(index: usize, count: usize) -> f32 {
    if count <= 1 {
        0.5
    } else {
        index as f32 / (count - 1) as f32
    }
}

/// Per-frame chance that a beam is lit.
pub fn activation_probability(energy: f32, flicker: f32) -> f32 {
    let e = sanitize_unit(energy);
    let on = map_range(e, 0.0, 1.0, 0.06, 0.9);
    on * (0.6 + flicker.clamp(0.0, 1.0) * 0.4)
}

impl Beam {
    /// Advances the phase and computes this frame's pose relative to `origin`.
    pub fn step(
        &mut self,
        index: usize,
        count: usize,
        origin: (f32, f32),
        energy: f32,
        transition: &ModeTransition,
        frame: u64,
        rng: &mut fastrand::Rng,
    ) -> BeamPose {
        let e = sanitize_unit(energy);
        self.phase += self.speed * (1.0 + e * 2.5);

        let sample = BeamSample {
            phase: self.phase,
            index,
            count,
            frame,
            seed: self.seed,
        };
        let prev = transition.previous();
        let curr = transition.current();
        let k = transition.fraction();
        let off = lerp(prev.offset(&sample), curr.offset(&sample), k);

        let spread = (index as f32 - (count.max(1) - 1) as f32 / 2.0) * 0.02;
        let angle = self.angle_base + off * 0.5 + spread;

        let len_prev = if prev == curr {
            1.0
        } else {
            1.0 + 0.05 * (self.phase + prev.index() as f32).sin()
        };
        let len_curr = 1.0 + 0.2 * e;
        let len = self.len_base * lerp(len_prev, len_curr, k);

        let active = rng.f32() < activation_probability(e, self.flicker);

        BeamPose {
            angle,
            len,
            end: (origin.0 + angle.cos() * len, origin.1 + angle.sin() * len),
            active,
        }
    }
}

/// Glow stack for one beam, thin bright core first. `scale` shrinks widths for small canvases.
pub fn glow_layers(color: Rgb, active: bool, energy: f32, scale: f32) -> [Stroke; GLOW_LAYERS] {
    let e = sanitize_unit(energy);
    std::array::from_fn(|layer| {
        let l = layer as f32;
        let top = (GLOW_LAYERS - 1) as f32;
        let alpha_255 = if active {
            map_range(l, 0.0, top, 255.0, 12.0) * (0.25 + e * 1.6)
        } else {
            map_range(l, 0.0, top, 12.0, 2.0)
        };
        let glow = if layer == GLOW_LAYERS - 1 {
            12.0 * if active { 1.0 + e } else { 0.2 } * scale
        } else {
            0.0
        };
        Stroke {
            color,
            width: map_range(l, 0.0, top, 0.8, 4.0) * scale,
            alpha: (alpha_255 / 255.0).clamp(0.0, 1.0),
            glow,
        }
    })
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub(crate) fn sanitize_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_layers_fade_outwards() {
        let l = glow_layers(Rgb::WHITE, true, 0.5, 1.0);
        assert!(l[0].alpha > l[1].alpha && l[1].alpha > l[2].alpha);
        assert!(l[0].width < l[2].width);
        assert_eq!(l[0].glow, 0.0);
        assert!((l[2].glow - 18.0).abs() < 1e-4);

        let dim = glow_layers(Rgb::WHITE, false, 1.0, 1.0);
        assert!((dim[0].alpha - 12.0 / 255.0).abs() < 1e-6);
        assert!((dim[2].glow - 2.4).abs() < 1e-4);
    }
}
