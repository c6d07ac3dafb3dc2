use crate::visual::AnimationMode;
use std::fmt;
use std::path::Path;

/// Length of the crossfade between two modes, in seconds.
pub const TRANSITION_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeScheduleEntry {
    pub time_s: f32,
    pub mode: AnimationMode,
}

/// Time-ordered table of mode changes relative to song position.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSchedule {
    entries: Vec<ModeScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    Io(String),
    Parse { line: usize, message: String },
    Empty,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
            Self::Empty => write!(f, "schedule must contain at least one entry"),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl Default for ModeSchedule {
    fn default() -> Self {
        use AnimationMode::*;
        let table = [
            (0.0, Rotate),
            (7.6, Sweep),
            (28.3, Noise),
            (42.2, Sine),
            (70.5, Noise),
            (84.5, Rotate),
            (98.0, Sweep),
            (111.0, Sine),
            (139.0, Noise),
        ];
        Self {
            entries: table
                .into_iter()
                .map(|(time_s, mode)| ModeScheduleEntry { time_s, mode })
                .collect(),
        }
    }
}

impl ModeSchedule {
    /// Builds a schedule from arbitrary entries; they are sorted by time.
    pub fn new(mut entries: Vec<ModeScheduleEntry>) -> Result<Self, ScheduleError> {
        if entries.is_empty() {
            return Err(ScheduleError::Empty);
        }
        entries.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| ScheduleError::Io(format!("{}: {err}", path.as_ref().display())))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let mut entries = Vec::new();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(time_raw), Some(mode_raw)) = (parts.next(), parts.next()) else {
                return Err(ScheduleError::Parse {
                    line: line_no,
                    message: "expected <time> <mode>".to_string(),
                });
            };
            if parts.next().is_some() {
                return Err(ScheduleError::Parse {
                    line: line_no,
                    message: "unexpected trailing tokens".to_string(),
                });
            }

            let time_s = parse_timestamp(time_raw).ok_or_else(|| ScheduleError::Parse {
                line: line_no,
                message: format!("invalid time '{time_raw}'"),
            })?;
            let mode = mode_raw.parse::<AnimationMode>().map_err(|message| {
                ScheduleError::Parse {
                    line: line_no,
                    message,
                }
            })?;
            entries.push(ModeScheduleEntry { time_s, mode });
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[ModeScheduleEntry] {
        &self.entries
    }

    /// Mode of the last entry at or before `position_s`, or the first entry's
    /// mode when the position precedes the whole table.
    pub fn resolve(&self, position_s: f32) -> AnimationMode {
        let idx = self.entries.partition_point(|e| e.time_s <= position_s);
        self.entries[idx.saturating_sub(1)].mode
    }
}

/// Accepts plain seconds (`7.6`), `mm:ss[.fff]` or `hh:mm:ss[.fff]`.
fn parse_timestamp(token: &str) -> Option<f32> {
    let parts: Vec<&str> = token.split(':').collect();
    let secs = match parts.as_slice() {
        [s] => parse_secs(s)?,
        [m, s] => {
            let min = m.parse::<u32>().ok()?;
            min as f32 * 60.0 + parse_secs(s)?
        }
        [h, m, s] => {
            let hour = h.parse::<u32>().ok()?;
            let min = m.parse::<u32>().ok()?;
            hour as f32 * 3600.0 + min as f32 * 60.0 + parse_secs(s)?
        }
        _ => return None,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

fn parse_secs(value: &str) -> Option<f32> {
    value.replace(',', ".").parse::<f32>().ok()
}

/// Crossfade bookkeeping between the previous and the current mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTransition {
    current: AnimationMode,
    previous: AnimationMode,
    changed_at_s: f64,
    fraction: f32,
}

impl Default for ModeTransition {
    fn default() -> Self {
        Self {
            current: AnimationMode::Sine,
            previous: AnimationMode::Sine,
            changed_at_s: 0.0,
            fraction: 1.0,
        }
    }
}

impl ModeTransition {
    /// Feeds the scheduled mode for this frame. `now_s` is wall-clock time.
    /// Returns true when the mode changed.
    pub fn update(&mut self, scheduled: AnimationMode, now_s: f64) -> bool {
        let changed = scheduled != self.current;
        if changed {
            self.previous = self.current;
            self.current = scheduled;
            self.changed_at_s = now_s;
            self.fraction = 0.0;
        }
        let elapsed = (now_s - self.changed_at_s) / TRANSITION_SECS;
        self.fraction = if elapsed.is_finite() {
            elapsed.clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        changed
    }

    pub fn current(&self) -> AnimationMode {
        self.current
    }

    pub fn previous(&self) -> AnimationMode {
        self.previous
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    pub fn changed_at(&self) -> f64 {
        self.changed_at_s
    }

    pub fn is_blending(&self) -> bool {
        self.fraction < 1.0
    }
}
