//! Software RGBA surface used as the screen and as offscreen layers.
//!
//! Coordinates are pixel units with the origin at the top-left corner; pixel
//! centres sit at `(x + 0.5, y + 0.5)`. Every pixel is kept opaque, so a layer
//! that should behave as "transparent" is simply black and composited with
//! [`Blend::Add`].

use std::ops::RangeInclusive;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Self = Self(0, 0, 0);
    pub const WHITE: Self = Self(255, 255, 255);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// Source-over with the given alpha.
    Alpha,
    /// Saturating additive.
    Add,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f32,
    /// 0..1
    pub alpha: f32,
    /// Halo radius in pixels; 0 disables the halo.
    pub glow: f32,
}

pub struct Canvas {
    w: usize,
    h: usize,
    px: Vec<u8>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        let mut c = Self {
            w: 0,
            h: 0,
            px: Vec::new(),
        };
        c.resize(w, h);
        c
    }

    /// Reallocates and clears to black.
    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.clear();
        self.px.resize(w.saturating_mul(h).saturating_mul(4), 0);
        self.clear(Rgb::BLACK);
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn pixels(&self) -> &[u8] {
        &self.px
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let i = (y * self.w + x) * 4;
        Some([self.px[i], self.px[i + 1], self.px[i + 2], self.px[i + 3]])
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.px.chunks_exact_mut(4) {
            px[0] = color.0;
            px[1] = color.1;
            px[2] = color.2;
            px[3] = 255;
        }
    }

    /// Alpha-blends `color` over the whole surface. Used for motion trails.
    pub fn fade(&mut self, color: Rgb, alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let c = [color.0 as f32, color.1 as f32, color.2 as f32];
        for px in self.px.chunks_exact_mut(4) {
            for ch in 0..3 {
                px[ch] = mix(px[ch], c[ch], a);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, diameter: f32, color: Rgb, alpha: f32) {
        let r = (diameter * 0.5).max(0.0);
        let alpha = alpha.clamp(0.0, 1.0);
        if !(cx.is_finite() && cy.is_finite() && r.is_finite()) || alpha <= 0.0 {
            return;
        }
        let reach = r + 1.0;
        let (Some(xs), Some(ys)) = (
            pixel_range(cx - reach, cx + reach, self.w),
            pixel_range(cy - reach, cy + reach, self.h),
        ) else {
            return;
        };
        for y in ys {
            for x in xs.clone() {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                // Sub-pixel discs still leave a faint dot.
                let cover = (r + 0.5 - d).clamp(0.0, 1.0).min(r.max(0.15) * 2.0);
                self.blend_px(x, y, color, cover * alpha);
            }
        }
    }

    /// Square-capped segment with anti-aliased edges and an optional halo.
    pub fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32), stroke: &Stroke) {
        if self.w == 0 || self.h == 0 || stroke.alpha <= 0.0 {
            return;
        }
        if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
            return;
        }

        let half = (stroke.width * 0.5).max(0.25);
        let glow = if stroke.glow.is_finite() { stroke.glow.max(0.0) } else { 0.0 };
        let reach = half + glow * 3.0 + 1.0;

        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = if len > 1e-4 { (dx / len, dy / len) } else { (1.0, 0.0) };

        // Walk the major axis; on each step cover the minor-axis span around the centre line.
        let x_major = dx.abs() >= dy.abs();
        let (a0, a1, b0, slope, major_size, minor_size) = if x_major {
            let slope = if dx.abs() > 1e-4 { dy / dx } else { 0.0 };
            (from.0, to.0, from.1, slope, self.w, self.h)
        } else {
            let slope = if dy.abs() > 1e-4 { dx / dy } else { 0.0 };
            (from.1, to.1, from.0, slope, self.h, self.w)
        };
        let span = reach * (1.0 + slope * slope).sqrt();

        let Some(major) = pixel_range(a0.min(a1) - reach, a0.max(a1) + reach, major_size) else {
            return;
        };

        for m in major {
            let mc = m as f32 + 0.5;
            let centre = b0 + (mc - a0) * slope;
            let Some(minor) = pixel_range(centre - span, centre + span, minor_size) else {
                continue;
            };
            for n in minor {
                let (x, y) = if x_major { (m, n) } else { (n, m) };
                let rx = x as f32 + 0.5 - from.0;
                let ry = y as f32 + 0.5 - from.1;
                let along = rx * ux + ry * uy;
                let across = (rx * uy - ry * ux).abs();
                let cap = (along + half).min(len + half - along);

                let core = (half + 0.5 - across).clamp(0.0, 1.0) * (cap + 0.5).clamp(0.0, 1.0);
                let halo = if glow > 0.0 {
                    0.5 * (-(across - half).max(0.0) / glow).exp() * (-(-cap).max(0.0) / glow).exp()
                } else {
                    0.0
                };
                let a = core.max(halo) * stroke.alpha.min(1.0);
                if a > 1.0 / 512.0 {
                    self.blend_px(x, y, stroke.color, a);
                }
            }
        }
    }

    /// Draws `src` over this canvas. Mismatched sizes composite the overlapping region.
    pub fn composite(&mut self, src: &Canvas, blend: Blend, alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let w = self.w.min(src.w);
        let h = self.h.min(src.h);
        for y in 0..h {
            let drow = y * self.w * 4;
            let srow = y * src.w * 4;
            for x in 0..w {
                let di = drow + x * 4;
                let si = srow + x * 4;
                for ch in 0..3 {
                    let s = src.px[si + ch] as f32;
                    self.px[di + ch] = match blend {
                        Blend::Alpha => mix(self.px[di + ch], s, a),
                        Blend::Add => (self.px[di + ch] as f32 + s * a).min(255.0) as u8,
                    };
                }
            }
        }
    }

    fn blend_px(&mut self, x: usize, y: usize, color: Rgb, alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        let i = (y * self.w + x) * 4;
        self.px[i] = mix(self.px[i], color.0 as f32, a);
        self.px[i + 1] = mix(self.px[i + 1], color.1 as f32, a);
        self.px[i + 2] = mix(self.px[i + 2], color.2 as f32, a);
    }
}

#[inline]
fn mix(dst: u8, src: f32, a: f32) -> u8 {
    // Truncation lets repeated fades reach exact black.
    (dst as f32 + (src - dst as f32) * a).clamp(0.0, 255.0) as u8
}

/// Pixel indices whose centres may fall in `[lo, hi]`, clipped to `0..size`.
fn pixel_range(lo: f32, hi: f32, size: usize) -> Option<RangeInclusive<usize>> {
    if size == 0 || !(lo.is_finite() && hi.is_finite()) || hi < 0.0 || lo > (size - 1) as f32 + 1.0 {
        return None;
    }
    let a = lo.floor().max(0.0) as usize;
    let b = (hi.ceil() as usize).min(size - 1);
    (a <= b).then_some(a..=b)
}
