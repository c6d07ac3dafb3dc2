use noise::{NoiseFn, Perlin};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DRIFT_FIELD: LazyLock<Perlin> = LazyLock::new(|| Perlin::new(0x5EED));

/// Off-lattice row for 1D sampling of the 2D Perlin field (integer rows are all zero).
const DRIFT_ROW: f64 = 0.371;

/// How the beams of an anchor swing around their base angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimationMode {
    Sine,
    Sweep,
    Noise,
    Rotate,
}

/// Everything an offset function may look at for one beam.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamSample {
    pub phase: f32,
    pub index: usize,
    pub count: usize,
    pub frame: u64,
    pub seed: f32,
}

impl AnimationMode {
    pub const fn all() -> [Self; 4] {
        [Self::Sine, Self::Sweep, Self::Noise, Self::Rotate]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Sine => 0,
            Self::Sweep => 1,
            Self::Noise => 2,
            Self::Rotate => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Sweep => "sweep",
            Self::Noise => "noise",
            Self::Rotate => "rotate",
        }
    }

    /// Angular offset (radians, before the 0.5 damping applied by the beam update).
    pub fn offset(self, s: &BeamSample) -> f32 {
        let j = s.index as f32;
        let t = s.frame as f32;
        match self {
            // gentle wobble
            Self::Sine => (s.phase + j * 0.2 + t * 0.02).sin() * 0.35,
            // wave travelling across the fan
            Self::Sweep => (t * 0.01 + j * 0.6 + s.seed * 0.001).sin() * 0.8,
            Self::Noise => (drift(s.seed + t * 0.001 + j * 0.1) - 0.5) * 1.2,
            Self::Rotate => {
                let n = s.count.max(1) as f32;
                (t * 0.002 + s.seed * 0.0005).sin() * 1.2 + 0.6 * (j - n / 2.0) / n
            }
        }
    }
}

/// Smooth coherent noise in [0, 1].
pub fn drift(x: f32) -> f32 {
    let v = DRIFT_FIELD.get([x as f64, DRIFT_ROW]) as f32;
    (v * 0.5 + 0.5).clamp(0.0, 1.0)
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let want = s.trim();
        Self::all()
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(want))
            .ok_or_else(|| format!("unknown mode '{want}' (expected sine, sweep, noise or rotate)"))
    }
}
