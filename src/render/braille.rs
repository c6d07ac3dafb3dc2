use crate::render::{frame_begin, frame_end, luma_u16, Frame, Renderer};
use std::io::Write;

/// One cell = a 2x4 braille dot matrix split into bright ("on") and dark ("off") pixels.
pub struct BrailleRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

/// Running RGB sum for averaging a subset of cell pixels.
#[derive(Default)]
struct Mean {
    r: u32,
    g: u32,
    b: u32,
    n: u32,
}

impl Mean {
    fn add(&mut self, (r, g, b): (u8, u8, u8)) {
        self.r += r as u32;
        self.g += g as u32;
        self.b += b as u32;
        self.n += 1;
    }

    fn get(&self) -> Option<(u8, u8, u8)> {
        (self.n > 0).then(|| {
            (
                (self.r / self.n) as u8,
                (self.g / self.n) as u8,
                (self.b / self.n) as u8,
            )
        })
    }
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows)) = frame_begin(frame, 2, 4, out)? else {
            return Ok(());
        };
        let w = frame.pixel_width;
        let px = frame.pixels_rgba;
        self.last_fg = None;
        self.last_bg = None;

        for row in 0..visual_rows {
            let base_y = row * 4;
            for col in 0..cols {
                let base_x = col * 2;

                let mut lum = [0u16; 8];
                let mut rgb = [(0u8, 0u8, 0u8); 8];
                for dy in 0..4usize {
                    for dx in 0..2usize {
                        let i = dy * 2 + dx;
                        let idx = ((base_y + dy) * w + base_x + dx) * 4;
                        rgb[i] = (px[idx], px[idx + 1], px[idx + 2]);
                        lum[i] = luma_u16(px[idx], px[idx + 1], px[idx + 2]);
                    }
                }

                let min_l = lum.iter().copied().min().unwrap_or(0);
                let max_l = lum.iter().copied().max().unwrap_or(0);
                let thr = (min_l + max_l) / 2;

                let mut bits = 0u8;
                let mut on = Mean::default();
                let mut off = Mean::default();
                for i in 0..8 {
                    if lum[i] > thr {
                        bits |= DOT_BITS[i];
                        on.add(rgb[i]);
                    } else {
                        off.add(rgb[i]);
                    }
                }

                let (fgc, bgc, ch) = if bits == 0 {
                    let c = off.get().unwrap_or((0, 0, 0));
                    (c, c, ' ')
                } else {
                    let fgc = on.get().unwrap_or((0, 0, 0));
                    let bgc = off.get().unwrap_or(fgc);
                    let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
                    (fgc, bgc, ch)
                };

                if self.last_fg != Some(fgc) {
                    write!(out, "\x1b[38;2;{};{};{}m", fgc.0, fgc.1, fgc.2)?;
                    self.last_fg = Some(fgc);
                }
                if self.last_bg != Some(bgc) {
                    write!(out, "\x1b[48;2;{};{};{}m", bgc.0, bgc.1, bgc.2)?;
                    self.last_bg = Some(bgc);
                }
                write!(out, "{ch}")?;
            }
            if row + 1 < visual_rows {
                out.write_all(b"\r\n")?;
            }
        }

        frame_end(frame, cols, visual_rows, out)
    }
}
