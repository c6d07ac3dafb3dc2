use crate::audio::{spawn_analyzer, AtomicAudioFeatures};
use anyhow::{anyhow, bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use ringbuf::traits::{Producer as _, Split as _};
use ringbuf::HeapRb;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

/// Play/pause controls shared by the real track and test doubles.
pub trait Transport {
    fn is_loaded(&self) -> bool;
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    /// Playback position in seconds.
    fn current_time(&self) -> f32;

    /// Flips play/pause. Does nothing (and returns false) until the track has loaded.
    fn toggle(&mut self) -> bool {
        if !self.is_loaded() {
            return false;
        }
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        true
    }
}

/// Decoded track, interleaved `f32` in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub sample_rate_hz: u32,
    pub channels: u16,
    samples: Vec<f32>,
}

impl Pcm {
    pub fn new(sample_rate_hz: u32, channels: u16, samples: Vec<f32>) -> anyhow::Result<Self> {
        if sample_rate_hz == 0 || channels == 0 {
            bail!("invalid pcm layout: {sample_rate_hz} Hz, {channels} channels");
        }
        Ok(Self {
            sample_rate_hz,
            channels,
            samples,
        })
    }

    pub fn decode(path: &Path) -> anyhow::Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("open wav {}", path.display()))?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: Read>(mut reader: hound::WavReader<R>) -> anyhow::Result<Self> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("decode float samples")?,
            hound::SampleFormat::Int => {
                if !(8..=32).contains(&spec.bits_per_sample) {
                    bail!("unsupported wav bit depth: {}", spec.bits_per_sample);
                }
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("decode integer samples")?
            }
        };
        Self::new(spec.sample_rate, spec.channels, samples)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_s(&self) -> f32 {
        self.frames() as f32 / self.sample_rate_hz as f32
    }

    pub fn frame(&self, idx: usize) -> &[f32] {
        let ch = self.channels as usize;
        &self.samples[idx * ch..idx * ch + ch]
    }
}

/// Transport state shared between the UI thread and the output callback.
#[derive(Default)]
pub struct Playback {
    pcm: OnceLock<Pcm>,
    load_failed: AtomicBool,
    playing: AtomicBool,
    /// Source-frame position, `f64` bits.
    cursor: AtomicU64,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the decoded track available. Only the first call has an effect.
    pub fn install(&self, pcm: Pcm) -> bool {
        self.pcm.set(pcm).is_ok()
    }

    pub fn mark_failed(&self) {
        self.load_failed.store(true, Ordering::Relaxed);
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed.load(Ordering::Relaxed)
    }

    pub fn pcm(&self) -> Option<&Pcm> {
        self.pcm.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.pcm.get().is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn play(&self) {
        let Some(pcm) = self.pcm.get() else {
            return;
        };
        if self.cursor_frames() >= pcm.frames() as f64 {
            self.set_cursor(0.0);
        }
        self.playing.store(true, Ordering::Release);
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    pub fn current_time(&self) -> f32 {
        match self.pcm.get() {
            Some(pcm) => {
                let frames = self.cursor_frames().min(pcm.frames() as f64);
                (frames / pcm.sample_rate_hz as f64) as f32
            }
            None => 0.0,
        }
    }

    fn cursor_frames(&self) -> f64 {
        f64::from_bits(self.cursor.load(Ordering::Acquire))
    }

    fn set_cursor(&self, frames: f64) {
        self.cursor.store(frames.to_bits(), Ordering::Release);
    }

    /// Renders one output buffer at `device_rate_hz` and hands each frame's mono mix to `tap`.
    /// Silence while paused or loading; playback stops by itself at the end of the track.
    pub fn fill<T>(&self, data: &mut [T], channels: usize, device_rate_hz: u32, mut tap: impl FnMut(f32))
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = channels.max(1);
        let pcm = match self.pcm.get() {
            Some(pcm) if self.is_playing() => pcm,
            _ => {
                for out in data.chunks_mut(channels) {
                    out.fill(T::from_sample(0.0f32));
                    tap(0.0);
                }
                return;
            }
        };

        let step = pcm.sample_rate_hz as f64 / device_rate_hz.max(1) as f64;
        let total = pcm.frames();
        let mut cursor = self.cursor_frames();
        let mut ended = false;

        for out in data.chunks_mut(channels) {
            let idx = cursor as usize;
            if idx >= total {
                ended = true;
                out.fill(T::from_sample(0.0f32));
                tap(0.0);
                continue;
            }
            let src = pcm.frame(idx);
            let mono = src.iter().sum::<f32>() / src.len() as f32;
            if out.len() == 1 {
                out[0] = T::from_sample(mono);
            } else {
                for (c, o) in out.iter_mut().enumerate() {
                    *o = T::from_sample(src[c.min(src.len() - 1)]);
                }
            }
            tap(mono);
            cursor += step;
        }

        self.set_cursor(cursor.min(total as f64));
        if ended {
            self.playing.store(false, Ordering::Release);
        }
    }
}

impl Transport for Playback {
    fn is_loaded(&self) -> bool {
        Playback::is_loaded(self)
    }

    fn is_playing(&self) -> bool {
        Playback::is_playing(self)
    }

    fn play(&mut self) {
        Playback::play(self)
    }

    fn pause(&mut self) {
        Playback::pause(self)
    }

    fn current_time(&self) -> f32 {
        Playback::current_time(self)
    }
}

/// A WAV file decoded in the background and played on an output device.
pub struct Track {
    playback: Arc<Playback>,
    // Keep the output stream alive for the full Track lifetime.
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    features: Arc<AtomicAudioFeatures>,
}

impl Track {
    pub fn open(path: &Path, device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_output_device(&host, device_query)?;
        let supported = device
            .default_output_config()
            .context("get default output config")?;
        let device_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();
        log::info!(
            "output device: {} @ {device_rate_hz} Hz, {channels} ch",
            device.name().unwrap_or_else(|_| "<unknown>".to_string())
        );

        let rb = HeapRb::<f32>::new((device_rate_hz as usize).saturating_mul(2));
        let (mut prod, cons) = rb.split();

        let playback = Arc::new(Playback::new());
        let stop = Arc::new(AtomicBool::new(false));
        let features = Arc::new(AtomicAudioFeatures::new());

        let err_fn = |err| log::error!("audio stream error: {err}");

        let cb_playback = Arc::clone(&playback);
        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    cb_playback.fill(data, channels, device_rate_hz, |s| {
                        let _ = prod.try_push(s);
                    })
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    cb_playback.fill(data, channels, device_rate_hz, |s| {
                        let _ = prod.try_push(s);
                    })
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    cb_playback.fill(data, channels, device_rate_hz, |s| {
                        let _ = prod.try_push(s);
                    })
                },
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start output stream")?;

        let analyzer_handle = spawn_analyzer(
            cons,
            device_rate_hz,
            Arc::clone(&stop),
            Arc::clone(&features),
        );

        let loader_playback = Arc::clone(&playback);
        let loader_path = path.to_path_buf();
        thread::spawn(move || match Pcm::decode(&loader_path) {
            Ok(pcm) => {
                log::info!(
                    "loaded {} ({:.1}s, {} Hz, {} ch)",
                    loader_path.display(),
                    pcm.duration_s(),
                    pcm.sample_rate_hz,
                    pcm.channels
                );
                loader_playback.install(pcm);
            }
            Err(err) => {
                log::error!("failed to load {}: {err:#}", loader_path.display());
                loader_playback.mark_failed();
            }
        });

        Ok(Self {
            playback,
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            features,
        })
    }

    pub fn features(&self) -> Arc<AtomicAudioFeatures> {
        Arc::clone(&self.features)
    }

    pub fn load_failed(&self) -> bool {
        self.playback.load_failed()
    }

    pub fn duration_s(&self) -> Option<f32> {
        self.playback.pcm().map(Pcm::duration_s)
    }
}

impl Transport for Track {
    fn is_loaded(&self) -> bool {
        self.playback.is_loaded()
    }

    fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    fn play(&mut self) {
        self.playback.play()
    }

    fn pause(&mut self) {
        self.playback.pause()
    }

    fn current_time(&self) -> f32 {
        self.playback.current_time()
    }
}

impl Drop for Track {
    fn drop(&mut self) {
        self.playback.pause();
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

pub fn list_output_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .context("enumerate output devices")?;

    let mut out = io::stdout();
    writeln!(out, "Output devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

fn select_output_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let Some(want) = device_query.map(str::to_lowercase) else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device found"));
    };

    host.output_devices()
        .context("enumerate output devices")?
        .find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&want))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no output device matching: {want}"))
}
