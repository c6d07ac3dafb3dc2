use laser_visualizer::audio::{AtomicAudioFeatures, AudioFeatures, SpectrumAnalyzer, FFT_SIZE, HOP};
use laser_visualizer::track::{Pcm, Playback, Transport};
use std::f32::consts::PI;
use std::io::Cursor;

/// Generate a mono sine wave of `n` samples.
fn synth_sine(freq: f32, amp: f32, sr: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin() * amp)
        .collect()
}

fn analyze(samples: &[f32], sr: u32) -> Vec<AudioFeatures> {
    let mut a = SpectrumAnalyzer::new(sr);
    samples.iter().filter_map(|&s| a.push(s)).collect()
}

fn ramp_pcm(frames: usize, sr: u32) -> Pcm {
    let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
    Pcm::new(sr, 1, samples).unwrap()
}

// ── Spectrum analyzer ───────────────────────────────────────────────────────

#[test]
fn analyzer_emits_once_per_hop_after_window_fills() {
    let out = analyze(&vec![0.1; FFT_SIZE + HOP * 3], 44_100);
    assert_eq!(out.len(), 4);
    assert!(analyze(&vec![0.1; FFT_SIZE - 1], 44_100).is_empty());
}

#[test]
fn low_sine_lands_in_bass() {
    let out = analyze(&synth_sine(60.0, 0.8, 44_100, 44_100), 44_100);
    let last = *out.last().unwrap();
    assert!(last.bass > 0.5, "bass {}", last.bass);
    assert!(last.bass > last.treble + 0.3, "{last:?}");
    assert!((last.level - 0.8 / 2f32.sqrt()).abs() < 0.05, "level {}", last.level);
}

#[test]
fn high_sine_lands_in_treble() {
    let out = analyze(&synth_sine(8_000.0, 0.8, 44_100, 44_100), 44_100);
    let last = *out.last().unwrap();
    assert!(last.treble > last.bass, "{last:?}");
    assert!(last.treble > 0.02, "{last:?}");
    assert!(last.bass < 0.05, "{last:?}");
}

#[test]
fn silence_is_all_zero() {
    let out = analyze(&vec![0.0; FFT_SIZE * 4], 48_000);
    let last = *out.last().unwrap();
    assert_eq!(last, AudioFeatures::default());
}

#[test]
fn non_finite_samples_are_dropped() {
    let mut samples = synth_sine(440.0, 0.5, 48_000, FFT_SIZE * 2);
    samples[100] = f32::NAN;
    samples[900] = f32::INFINITY;
    for f in analyze(&samples, 48_000) {
        assert!(f.level.is_finite() && f.bass.is_finite());
        assert!((0.0..=1.0).contains(&f.mid));
    }
}

#[test]
fn features_are_sanitized_into_unit_range() {
    let f = AudioFeatures {
        level: f32::NAN,
        bass: 3.0,
        mid: -1.0,
        treble: 0.25,
    }
    .sanitized();
    assert_eq!(
        f,
        AudioFeatures {
            level: 0.0,
            bass: 1.0,
            mid: 0.0,
            treble: 0.25
        }
    );
}

#[test]
fn atomic_features_publish_latest_snapshot() {
    let shared = AtomicAudioFeatures::new();
    assert_eq!(shared.load(), AudioFeatures::default());
    assert_eq!(shared.age_ms(), 0.0);

    let f = AudioFeatures {
        level: 0.3,
        bass: 0.9,
        mid: 0.4,
        treble: 0.1,
    };
    shared.store(f);
    assert_eq!(shared.load(), f);
    assert!(shared.age_ms() < 60_000.0);
}

// ── PCM decoding ────────────────────────────────────────────────────────────

#[test]
fn pcm_decodes_int16_stereo_wav() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..100 {
            w.write_sample(16_384i16).unwrap();
            w.write_sample(-16_384i16).unwrap();
        }
        w.finalize().unwrap();
    }
    let reader = hound::WavReader::new(Cursor::new(cursor.into_inner())).unwrap();
    let pcm = Pcm::from_reader(reader).unwrap();
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.sample_rate_hz, 22_050);
    assert_eq!(pcm.frames(), 100);
    assert_eq!(pcm.frame(0), &[0.5, -0.5]);
    assert!((pcm.duration_s() - 100.0 / 22_050.0).abs() < 1e-7);
}

#[test]
fn pcm_decodes_float_wav() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in [0.25f32, -0.75, 1.0] {
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();
    }
    let reader = hound::WavReader::new(Cursor::new(cursor.into_inner())).unwrap();
    let pcm = Pcm::from_reader(reader).unwrap();
    assert_eq!(pcm.frames(), 3);
    assert_eq!(pcm.frame(1), &[-0.75]);
}

#[test]
fn pcm_rejects_bad_layout_and_missing_file() {
    assert!(Pcm::new(0, 1, Vec::new()).is_err());
    assert!(Pcm::new(44_100, 0, Vec::new()).is_err());
    assert!(Pcm::decode(std::path::Path::new("/no/such/track.wav")).is_err());
}

// ── Playback transport ──────────────────────────────────────────────────────

#[test]
fn toggle_before_load_is_a_no_op() {
    let mut p = Playback::new();
    assert!(!Transport::toggle(&mut p));
    assert!(!p.is_playing());
    assert_eq!(p.current_time(), 0.0);
    p.play();
    assert!(!p.is_playing());
}

#[test]
fn install_only_takes_the_first_track() {
    let p = Playback::new();
    assert!(p.install(ramp_pcm(10, 100)));
    assert!(!p.install(ramp_pcm(20, 100)));
    assert_eq!(p.pcm().map(Pcm::frames), Some(10));
}

#[test]
fn toggle_flips_play_and_pause() {
    let mut p = Playback::new();
    p.install(ramp_pcm(100, 100));
    assert!(Transport::toggle(&mut p));
    assert!(p.is_playing());
    assert!(Transport::toggle(&mut p));
    assert!(!p.is_playing());
}

#[test]
fn fill_advances_cursor_and_taps_mono() {
    let p = Playback::new();
    p.install(ramp_pcm(100, 100));
    p.play();

    let mut buf = vec![0.0f32; 50];
    let mut tapped = Vec::new();
    p.fill(&mut buf, 1, 100, |s| tapped.push(s));
    assert!((p.current_time() - 0.5).abs() < 1e-6);
    assert_eq!(tapped.len(), 50);
    assert_eq!(buf[10], 0.1);
    assert_eq!(tapped[10], 0.1);
}

#[test]
fn fill_duplicates_mono_into_stereo_and_resamples() {
    let p = Playback::new();
    p.install(ramp_pcm(100, 100));
    p.play();

    // Device at twice the track rate: every source frame lasts two output frames.
    let mut buf = vec![0.0f32; 8];
    p.fill(&mut buf, 2, 200, |_| {});
    assert_eq!(buf[0], buf[1]);
    assert_eq!(buf[2], 0.0);
    assert_eq!(buf[4], 0.01);
    assert!((p.current_time() - 0.02).abs() < 1e-6);
}

#[test]
fn fill_stops_at_end_and_play_rewinds() {
    let p = Playback::new();
    p.install(ramp_pcm(10, 100));
    p.play();

    let mut buf = vec![1.0f32; 16];
    p.fill(&mut buf, 1, 100, |_| {});
    assert!(!p.is_playing());
    assert!((p.current_time() - 0.1).abs() < 1e-6);
    assert!(buf[10..].iter().all(|&s| s == 0.0));

    p.play();
    assert!(p.is_playing());
    assert_eq!(p.current_time(), 0.0);
}

#[test]
fn paused_fill_is_silent_and_keeps_position() {
    let p = Playback::new();
    p.install(ramp_pcm(100, 100));
    p.play();
    let mut buf = vec![0.0f32; 20];
    p.fill(&mut buf, 1, 100, |_| {});
    p.pause();

    let mut buf = vec![7i16; 12];
    let mut taps = 0;
    p.fill(&mut buf, 2, 100, |s| {
        assert_eq!(s, 0.0);
        taps += 1;
    });
    assert_eq!(taps, 6);
    assert!(buf.iter().all(|&s| s == 0));
    assert!((p.current_time() - 0.2).abs() < 1e-6);
}
