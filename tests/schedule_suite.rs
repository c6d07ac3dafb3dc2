use laser_visualizer::schedule::{ModeSchedule, ModeScheduleEntry, ModeTransition, ScheduleError};
use laser_visualizer::visual::AnimationMode;

fn entry(time_s: f32, mode: AnimationMode) -> ModeScheduleEntry {
    ModeScheduleEntry { time_s, mode }
}

// ── Resolution ──────────────────────────────────────────────────────────────

#[test]
fn resolve_picks_last_entry_at_or_before_position() {
    let s = ModeSchedule::new(vec![
        entry(0.0, AnimationMode::Rotate),
        entry(7.6, AnimationMode::Sweep),
    ])
    .unwrap();
    assert_eq!(s.resolve(5.0), AnimationMode::Rotate);
    assert_eq!(s.resolve(7.6), AnimationMode::Sweep);
    assert_eq!(s.resolve(1000.0), AnimationMode::Sweep);
}

#[test]
fn resolve_before_first_entry_uses_first_mode() {
    let s = ModeSchedule::new(vec![
        entry(5.0, AnimationMode::Noise),
        entry(10.0, AnimationMode::Sine),
    ])
    .unwrap();
    assert_eq!(s.resolve(0.0), AnimationMode::Noise);
    assert_eq!(s.resolve(-3.0), AnimationMode::Noise);
}

#[test]
fn new_sorts_entries_and_rejects_empty() {
    let s = ModeSchedule::new(vec![
        entry(20.0, AnimationMode::Sine),
        entry(0.0, AnimationMode::Sweep),
    ])
    .unwrap();
    assert_eq!(s.entries()[0].mode, AnimationMode::Sweep);
    assert_eq!(s.resolve(10.0), AnimationMode::Sweep);
    assert_eq!(ModeSchedule::new(Vec::new()), Err(ScheduleError::Empty));
}

#[test]
fn default_table_follows_the_show() {
    let s = ModeSchedule::default();
    assert_eq!(s.entries().len(), 9);
    let expect = [
        (0.0, AnimationMode::Rotate),
        (10.0, AnimationMode::Sweep),
        (30.0, AnimationMode::Noise),
        (50.0, AnimationMode::Sine),
        (75.0, AnimationMode::Noise),
        (90.0, AnimationMode::Rotate),
        (100.0, AnimationMode::Sweep),
        (120.0, AnimationMode::Sine),
        (200.0, AnimationMode::Noise),
    ];
    for (t, mode) in expect {
        assert_eq!(s.resolve(t), mode, "at {t}s");
    }
    assert!(s.entries().windows(2).all(|w| w[0].time_s <= w[1].time_s));
}

// ── Parsing ─────────────────────────────────────────────────────────────────

#[test]
fn parse_accepts_comments_blank_lines_and_clock_times() {
    let text = "# opening\n0 rotate\n\n0:07.6 Sweep   # first drop\n1:10.5 noise\n";
    let s = ModeSchedule::parse(text).unwrap();
    assert_eq!(s.entries().len(), 3);
    assert_eq!(s.entries()[1].time_s, 7.6);
    assert_eq!(s.entries()[2].time_s, 70.5);
    assert_eq!(s.resolve(8.0), AnimationMode::Sweep);
}

#[test]
fn parse_reports_line_numbers() {
    let err = ModeSchedule::parse("0 sine\nabc sweep\n").unwrap_err();
    assert!(matches!(err, ScheduleError::Parse { line: 2, .. }), "{err:?}");

    let err = ModeSchedule::parse("0 wobble").unwrap_err();
    match err {
        ScheduleError::Parse { line, message } => {
            assert_eq!(line, 1);
            assert!(message.contains("wobble"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(
        ModeSchedule::parse("0 sine extra"),
        Err(ScheduleError::Parse { line: 1, .. })
    ));
    assert!(matches!(
        ModeSchedule::parse("5"),
        Err(ScheduleError::Parse { line: 1, .. })
    ));
}

#[test]
fn parse_of_only_comments_is_empty() {
    assert_eq!(ModeSchedule::parse("# nothing\n\n"), Err(ScheduleError::Empty));
}

#[test]
fn load_missing_file_is_io_error() {
    let err = ModeSchedule::load("/definitely/not/here.schedule").unwrap_err();
    assert!(matches!(err, ScheduleError::Io(_)));
    assert!(err.to_string().starts_with("I/O error"));
}

#[test]
fn load_reads_file_from_disk() {
    let path = std::env::temp_dir().join(format!("laser_schedule_{}.txt", std::process::id()));
    std::fs::write(&path, "0 noise\n3 sine\n").unwrap();
    let s = ModeSchedule::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(s.resolve(4.0), AnimationMode::Sine);
}

// ── Crossfade ───────────────────────────────────────────────────────────────

#[test]
fn transition_starts_settled_on_sine() {
    let t = ModeTransition::default();
    assert_eq!(t.current(), AnimationMode::Sine);
    assert_eq!(t.previous(), AnimationMode::Sine);
    assert_eq!(t.fraction(), 1.0);
    assert!(!t.is_blending());
}

#[test]
fn mode_change_resets_fraction_and_remembers_previous() {
    let s = ModeSchedule::new(vec![
        entry(0.0, AnimationMode::Rotate),
        entry(7.6, AnimationMode::Sweep),
    ])
    .unwrap();
    let mut t = ModeTransition::default();

    assert!(t.update(s.resolve(0.0), 0.0));
    assert!(!t.update(s.resolve(5.0), 5.0));
    assert_eq!(t.current(), AnimationMode::Rotate);
    assert_eq!(t.fraction(), 1.0);

    assert!(t.update(s.resolve(7.6), 7.6));
    assert_eq!(t.current(), AnimationMode::Sweep);
    assert_eq!(t.previous(), AnimationMode::Rotate);
    assert_eq!(t.fraction(), 0.0);
    assert_eq!(t.changed_at(), 7.6);
}

#[test]
fn fraction_is_monotone_and_clamped() {
    let mut t = ModeTransition::default();
    t.update(AnimationMode::Noise, 100.0);
    let mut last = t.fraction();
    for i in 1..=30 {
        t.update(AnimationMode::Noise, 100.0 + i as f64 * 0.05);
        assert!(t.fraction() >= last);
        assert!((0.0..=1.0).contains(&t.fraction()));
        last = t.fraction();
    }
    assert_eq!(t.fraction(), 1.0);
    assert!((t.changed_at() - 100.0).abs() < 1e-9);
}

#[test]
fn clock_going_backwards_does_not_leave_unit_range() {
    let mut t = ModeTransition::default();
    t.update(AnimationMode::Sweep, 50.0);
    t.update(AnimationMode::Sweep, 10.0);
    assert_eq!(t.fraction(), 0.0);
    t.update(AnimationMode::Sweep, f64::NAN);
    assert_eq!(t.fraction(), 1.0);
}

#[test]
fn changing_again_mid_fade_restarts_from_current() {
    let mut t = ModeTransition::default();
    t.update(AnimationMode::Rotate, 0.0);
    t.update(AnimationMode::Rotate, 0.5);
    t.update(AnimationMode::Noise, 0.6);
    assert_eq!(t.previous(), AnimationMode::Rotate);
    assert_eq!(t.current(), AnimationMode::Noise);
    assert_eq!(t.fraction(), 0.0);
}
