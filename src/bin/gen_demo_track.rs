use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use laser_visualizer::schedule::ModeSchedule;
use laser_visualizer::visual::AnimationMode;

/// Seconds of audio after the last schedule entry.
const TAIL_SECS: f32 = 12.0;

struct Args {
    out: PathBuf,
    sample_rate: u32,
    seconds: Option<f32>,
}

fn parse_args() -> Args {
    let mut out = PathBuf::from("assets/demo/laser_demo.wav");
    let mut sample_rate = 44_100u32;
    let mut seconds = None;

    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        let v = it.next();
        match (k.as_str(), v) {
            ("--out", Some(p)) => out = PathBuf::from(p),
            ("--sample-rate", Some(v)) => {
                if let Ok(sr) = v.parse::<u32>() {
                    sample_rate = sr.clamp(8_000, 192_000);
                }
            }
            ("--seconds", Some(v)) => seconds = v.parse::<f32>().ok().filter(|s| *s > 0.0),
            _ => {}
        }
    }

    Args {
        out,
        sample_rate,
        seconds,
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }

    let samples = make_demo_track(args.sample_rate, args.seconds);
    write_wav_i16_mono(&args.out, args.sample_rate, &samples)
        .with_context(|| format!("write {}", args.out.display()))?;

    println!("generated: {}", args.out.display());
    println!(
        "sample_rate={}Hz duration={:.2}s samples={}",
        args.sample_rate,
        samples.len() as f32 / args.sample_rate as f32,
        samples.len()
    );
    Ok(())
}

/// One section per built-in schedule entry, voiced so the dominant band follows the mode.
fn make_demo_track(sr: u32, limit_s: Option<f32>) -> Vec<i16> {
    let schedule = ModeSchedule::default();
    let entries = schedule.entries();
    let mut out = Vec::<i16>::new();

    for (i, entry) in entries.iter().enumerate() {
        let end = entries
            .get(i + 1)
            .map(|next| next.time_s)
            .unwrap_or(entry.time_s + TAIL_SECS);
        let end = limit_s.map_or(end, |l| end.min(l));
        let seconds = end - entry.time_s;
        if seconds <= 0.0 {
            break;
        }
        match entry.mode {
            AnimationMode::Rotate => push_bass_pulses(&mut out, sr, seconds, 120.0),
            AnimationMode::Sweep => push_chirp(&mut out, sr, seconds, 180.0, 12_000.0, 0.6),
            AnimationMode::Noise => push_dense_transients(&mut out, sr, seconds),
            AnimationMode::Sine => push_pad_section(&mut out, sr, seconds),
        }
    }

    // Sections above are cut from absolute times; keep the file length exact.
    if let Some(l) = limit_s {
        out.truncate((l * sr as f32).round() as usize);
    }
    out
}

fn push_silence(out: &mut Vec<i16>, sr: u32, seconds: f32) {
    let n = (seconds.max(0.0) * sr as f32).round() as usize;
    out.resize(out.len() + n, 0);
}

fn push_bass_pulses(out: &mut Vec<i16>, sr: u32, seconds: f32, bpm: f32) {
    let period = 60.0 / bpm;
    let hit = 0.08f32;
    let mut left = seconds.max(0.0);
    let mut k = 0u32;
    while left > 0.0 {
        let len = hit.min(left);
        push_pulse(out, sr, len, 55.0 + (k % 4) as f32 * 5.0, 0.9);
        left -= len;
        let gap = (period - hit).min(left);
        push_silence(out, sr, gap);
        left -= gap;
        k += 1;
    }
}

fn push_pulse(out: &mut Vec<i16>, sr: u32, seconds: f32, freq: f32, amp: f32) {
    let n = (seconds.max(0.0) * sr as f32).round() as usize;
    for i in 0..n {
        let t = i as f32 / sr as f32;
        let env = ((1.0 - t / seconds.max(1e-5)).max(0.0)).powf(1.6);
        out.push(to_i16((2.0 * PI * freq * t).sin() * amp * env));
    }
}

fn push_pad_section(out: &mut Vec<i16>, sr: u32, seconds: f32) {
    let n = (seconds.max(0.0) * sr as f32).round() as usize;
    for i in 0..n {
        let t = i as f32 / sr as f32;
        let swell = 0.5 + 0.2 * (t * 0.5).sin();
        let a = (2.0 * PI * (660.0 + 12.0 * (t * 0.21).sin()) * t).sin() * 0.4;
        let b = (2.0 * PI * (990.0 + 18.0 * (t * 0.17).cos()) * t).sin() * 0.3;
        let c = (2.0 * PI * (1_760.0 + 24.0 * (t * 0.13).sin()) * t).sin() * 0.2;
        out.push(to_i16((a + b + c) * swell));
    }
}

fn push_dense_transients(out: &mut Vec<i16>, sr: u32, seconds: f32) {
    let n = (seconds.max(0.0) * sr as f32).round() as usize;
    let beat_period = 60.0 / 160.0;
    for i in 0..n {
        let t = i as f32 / sr as f32;
        let phase = (t / beat_period).fract();
        let hit = if phase < 0.06 { 1.0 } else { 0.0 };

        let low = (2.0 * PI * 55.0 * t).sin() * (0.3 + 0.4 * hit);
        let mid = (2.0 * PI * 880.0 * t).sin() * 0.2;
        let hat = (2.0 * PI * 7_000.0 * t).sin() * (0.08 + 0.3 * hit);
        let noise = pseudo_noise(i as u32) * (0.04 + 0.2 * hit);
        out.push(to_i16(low + mid + hat + noise));
    }
}

fn push_chirp(out: &mut Vec<i16>, sr: u32, seconds: f32, f0: f32, f1: f32, amp: f32) {
    let n = (seconds.max(0.0) * sr as f32).round() as usize;
    let dur = seconds.max(1e-4);
    // Integrate frequency so the sweep stays phase-continuous.
    let mut phase = 0.0f32;
    for i in 0..n {
        let x = (i as f32 / sr as f32 / dur).clamp(0.0, 1.0);
        let f = f0 * (f1 / f0).powf(x);
        phase = (phase + 2.0 * PI * f / sr as f32) % (2.0 * PI);
        let env = 0.2 + 0.8 * (1.0 - (2.0 * x - 1.0).abs());
        out.push(to_i16(phase.sin() * amp * env));
    }
}

fn pseudo_noise(x: u32) -> f32 {
    let mut n = x.wrapping_mul(374_761_393);
    n ^= n >> 13;
    n = n.wrapping_mul(1_274_126_177);
    n ^= n >> 16;
    let v = (n & 0x00FF_FFFF) as f32 / 16_777_215.0;
    v * 2.0 - 1.0
}

fn to_i16(x: f32) -> i16 {
    let y = x.clamp(-1.0, 1.0);
    (y * i16::MAX as f32) as i16
}

fn write_wav_i16_mono(path: &Path, sr: u32, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        w.write_sample(s)?;
    }
    w.finalize()?;
    Ok(())
}
