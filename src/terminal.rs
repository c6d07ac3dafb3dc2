use anyhow::Context;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, ClearType},
};
use std::io::{stdout, Stdout, Write};

/// Restores sync output, autowrap and colours in case a frame was cut short.
const RESET_MODES: &[u8] = b"\x1b[?2026l\x1b[?7h\x1b[0m";

/// Owns the terminal while the show runs: raw mode, alternate screen, hidden
/// cursor and mouse reporting (clicks toggle playback).
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Raw mode is already on; Drop must run even if the rest fails.
        let guard = Self { _private: () };

        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            terminal::Clear(ClearType::All),
            cursor::Hide,
            EnableMouseCapture
        )
        .context("prepare alternate screen")?;

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(RESET_MODES);
        let _ = out.flush();
        let _ = execute!(
            out,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
    }
}
