use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const FFT_SIZE: usize = 1024;
pub const HOP: usize = 256;
/// Spectrum smoothing between successive analyses.
pub const SMOOTHING: f32 = 0.8;

const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Band edges in Hz.
pub const BASS_HZ: (f32, f32) = (20.0, 140.0);
pub const MID_HZ: (f32, f32) = (400.0, 2600.0);
pub const TREBLE_HZ: (f32, f32) = (5200.0, 14000.0);

/// One analysis snapshot; every field is in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    pub level: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl AudioFeatures {
    /// Clamps to [0, 1], mapping non-finite values to 0.
    pub fn sanitized(self) -> Self {
        fn unit(v: f32) -> f32 {
            if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
        }
        Self {
            level: unit(self.level),
            bass: unit(self.bass),
            mid: unit(self.mid),
            treble: unit(self.treble),
        }
    }
}

/// Seqlock-published features shared between the analyzer thread and the UI thread.
pub struct AtomicAudioFeatures {
    seq: AtomicU64,
    level: AtomicU32,
    bass: AtomicU32,
    mid: AtomicU32,
    treble: AtomicU32,
    updated_ms: AtomicU64,
}

impl Default for AtomicAudioFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicAudioFeatures {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            level: AtomicU32::new(0),
            bass: AtomicU32::new(0),
            mid: AtomicU32::new(0),
            treble: AtomicU32::new(0),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, f: AudioFeatures) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        self.level.store(f.level.to_bits(), Ordering::Relaxed);
        self.bass.store(f.bass.to_bits(), Ordering::Relaxed);
        self.mid.store(f.mid.to_bits(), Ordering::Relaxed);
        self.treble.store(f.treble.to_bits(), Ordering::Relaxed);
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> AudioFeatures {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let f = AudioFeatures {
                level: f32::from_bits(self.level.load(Ordering::Relaxed)),
                bass: f32::from_bits(self.bass.load(Ordering::Relaxed)),
                mid: f32::from_bits(self.mid.load(Ordering::Relaxed)),
                treble: f32::from_bits(self.treble.load(Ordering::Relaxed)),
            };

            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return f;
            }
        }
    }

    pub fn age_ms(&self) -> f32 {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return 0.0;
        }
        now_ms().saturating_sub(t) as f32
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

/// Sliding-window FFT over a mono sample stream.
pub struct SpectrumAnalyzer {
    sample_rate_hz: u32,
    window: Vec<f32>,
    write_pos: usize,
    filled: usize,
    since_last: usize,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate_hz: u32) -> Self {
        let n = FFT_SIZE;
        let hann = (0..n)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
            .collect();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            sample_rate_hz: sample_rate_hz.max(1),
            window: vec![0.0; n],
            write_pos: 0,
            filled: 0,
            since_last: 0,
            hann,
            fft: planner.plan_fft_forward(n),
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; n / 2],
        }
    }

    /// Feeds one sample; returns fresh features once per hop after the window has filled.
    pub fn push(&mut self, sample: f32) -> Option<AudioFeatures> {
        let n = self.window.len();
        self.window[self.write_pos] = if sample.is_finite() { sample } else { 0.0 };
        self.write_pos = (self.write_pos + 1) % n;
        if self.filled < n {
            self.filled += 1;
        }
        self.since_last += 1;
        if self.filled == n && self.since_last >= HOP {
            self.since_last = 0;
            return Some(self.analyze());
        }
        None
    }

    fn analyze(&mut self) -> AudioFeatures {
        let n = self.window.len();
        let half = self.smoothed.len();

        let mut sq = 0.0f32;
        for i in 0..n {
            let s = self.window[(self.write_pos + i) % n];
            sq += s * s;
            self.fft_buf[i] = Complex {
                re: s * self.hann[i],
                im: 0.0,
            };
        }
        let level = (sq / n as f32).sqrt().clamp(0.0, 1.0);

        self.fft.process(&mut self.fft_buf);
        for (m, c) in self.smoothed.iter_mut().zip(&self.fft_buf[..half]) {
            let mag = c.norm() / n as f32;
            *m = *m * SMOOTHING + mag * (1.0 - SMOOTHING);
        }

        AudioFeatures {
            level,
            bass: self.band_energy(BASS_HZ),
            mid: self.band_energy(MID_HZ),
            treble: self.band_energy(TREBLE_HZ),
        }
    }

    /// Mean of the dB-scaled spectrum over `band`, mapped to [0, 1].
    fn band_energy(&self, band: (f32, f32)) -> f32 {
        let bin_hz = self.sample_rate_hz as f32 / FFT_SIZE as f32;
        let nyquist_bin = self.smoothed.len() - 1;
        let lo = ((band.0 / bin_hz).round() as usize).min(nyquist_bin);
        let hi = ((band.1 / bin_hz).round() as usize).min(nyquist_bin);
        if hi < lo {
            return 0.0;
        }
        let bins = &self.smoothed[lo..=hi];
        let total: f32 = bins.iter().map(|&m| db_unit(m)).sum();
        total / bins.len() as f32
    }
}

fn db_unit(mag: f32) -> f32 {
    let db = 20.0 * mag.max(1e-12).log10();
    ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0)
}

/// Drains `cons` until `stop` is set, publishing features after every hop.
pub fn spawn_analyzer(
    mut cons: ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    stop: Arc<AtomicBool>,
    features: Arc<AtomicAudioFeatures>,
) -> thread::JoinHandle<()> {
    use ringbuf::traits::Consumer as _;

    thread::spawn(move || {
        let mut analyzer = SpectrumAnalyzer::new(sample_rate_hz);
        while !stop.load(Ordering::Relaxed) {
            let mut got_any = false;
            while let Some(s) = cons.try_pop() {
                got_any = true;
                if let Some(f) = analyzer.push(s) {
                    features.store(f);
                }
            }
            if !got_any {
                thread::sleep(Duration::from_millis(1));
            }
        }
    })
}
