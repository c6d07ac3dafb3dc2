use crate::visual::canvas::{Canvas, Rgb};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    /// Centred coordinates.
    pub x: f32,
    pub y: f32,
    /// Depth in [0.2, 1]; nearer stars are dimmer and bluer.
    pub z: f32,
    pub size: f32,
}

impl Star {
    pub fn color(&self) -> Rgb {
        let b = map_range(self.z, 0.2, 1.0, 255.0, 120.0).clamp(0.0, 255.0) as u8;
        Rgb(b, b, 255)
    }
}

const STAR_ALPHA: f32 = 200.0 / 255.0;

/// Static backdrop: generated once, rasterised into a cached layer on every resize.
#[derive(Clone, Debug, Default)]
pub struct Starfield {
    stars: Vec<Star>,
}

impl Starfield {
    pub fn generate(count: usize, w: usize, h: usize, rng: &mut fastrand::Rng) -> Self {
        let (w, h) = (w.max(1) as f32, h.max(1) as f32);
        let stars = (0..count)
            .map(|_| Star {
                x: rand_range(rng, -w, w),
                y: rand_range(rng, -h, h),
                z: rand_range(rng, 0.2, 1.0),
                size: rand_range(rng, 0.5, 3.0),
            })
            .collect();
        Self { stars }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Clears `layer` to black and draws every star around its centre.
    pub fn render(&self, layer: &mut Canvas, size_scale: f32) {
        layer.clear(Rgb::BLACK);
        let ox = layer.width() as f32 * 0.5;
        let oy = layer.height() as f32 * 0.5;
        for s in &self.stars {
            layer.fill_circle(ox + s.x, oy + s.y, s.size * size_scale, s.color(), STAR_ALPHA);
        }
    }
}

pub(crate) fn rand_range(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + rng.f32() * (hi - lo)
}

pub(crate) fn map_range(v: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let span = in_hi - in_lo;
    if span.abs() < f32::EPSILON {
        return out_lo;
    }
    out_lo + (v - in_lo) / span * (out_hi - out_lo)
}
