mod braille;
mod halfblock;

pub use braille::BrailleRenderer;
pub use halfblock::HalfBlockRenderer;

use crate::config::RendererMode;
use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    /// Text for the top-right time box.
    pub stopwatch: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub fn make_renderer(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
    }
}

/// Validates the frame for a renderer packing `px_w` x `px_h` pixels per cell.
/// Returns `(cols, visual_rows)` when painting should proceed; writes the
/// preamble (sync begin, home, autowrap off) in that case.
pub(crate) fn frame_begin(
    frame: &Frame<'_>,
    px_w: usize,
    px_h: usize,
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize)>> {
    let cols = frame.term_cols as usize;
    let visual_rows = frame.visual_rows as usize;
    let w = frame.pixel_width;
    let h = frame.pixel_height;

    if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols.saturating_mul(px_w) || h != visual_rows.saturating_mul(px_h) {
        // Internal mismatch; avoid panics.
        return Ok(None);
    }

    let need = w.saturating_mul(h).saturating_mul(4);
    if frame.pixels_rgba.len() < need {
        // Show it rather than index out of bounds.
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H\x1b[0m\x1b[2J")?;
        write!(
            out,
            "pixel buffer too small (need {}, got {})",
            need,
            frame.pixels_rgba.len()
        )?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    out.write_all(b"\x1b[H\x1b[0m")?;
    // Disable autowrap (DECAWM) while painting full-width rows; some terminals will otherwise
    // wrap when the last column is written, and the subsequent newline creates visible gaps.
    out.write_all(b"\x1b[?7l")?;
    Ok(Some((cols, visual_rows)))
}

/// HUD rows, time box, autowrap restore and sync end.
pub(crate) fn frame_end(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut hud_lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[38;2;200;200;200m\x1b[2K", visual_rows + i + 1)?;
        if let Some(line) = hud_lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            write!(out, "{clipped}")?;
        }
    }

    if let Some(text) = frame.stopwatch {
        draw_stopwatch_box(out, frame.term_cols, visual_rows as u16, text)?;
    }

    out.write_all(b"\x1b[0m\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Dark one-line box in the top-right corner of the visual area.
pub fn draw_stopwatch_box(
    out: &mut dyn Write,
    term_cols: u16,
    visual_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    let text = text.trim();
    if text.is_empty() || visual_rows < 2 {
        return Ok(());
    }
    let cols = term_cols as usize;
    let padding = 1usize;
    let margin = 1usize;
    let box_w = text.chars().count() + padding * 2;
    if box_w + margin > cols {
        return Ok(());
    }
    let col = cols - box_w - margin + 1;
    write!(
        out,
        "\x1b[2;{col}H\x1b[0m\x1b[48;2;16;16;20m\x1b[38;2;255;255;255m{pad}{text}{pad}\x1b[0m",
        pad = " ".repeat(padding)
    )?;
    Ok(())
}

#[inline]
pub(crate) fn luma_u16(r: u8, g: u8, b: u8) -> u16 {
    // Approx Rec.709 luma using integer math (0..255).
    let y = (r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8;
    y as u16
}
