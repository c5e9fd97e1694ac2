//! End-to-end pipeline tests driving the real-time sink directly
//!
//! These exercise the full engine (decode worker, equalize worker,
//! transport, generation-tagged flush) with a scripted decode
//! collaborator, standing in for the device callback by calling
//! `RealtimeSink::fill` on our own cadence.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{FailingDecoder, FlakyDecoder, ScriptedDecoder};
use tonal_core::{BandId, BandLayout, CoreError, GainVector, TransportState};
use tonal_engine::{
    EngineConfig, EngineError, EngineEvent, MemoryPresetStore, PlaybackEngine, RealtimeSink,
};

const FILL: usize = 512; // samples per simulated callback
const DEADLINE: Duration = Duration::from_secs(5);

fn engine_with_track(
    total_frames: u64,
) -> (PlaybackEngine, RealtimeSink) {
    let config = EngineConfig::default();
    let store = MemoryPresetStore::with_factory(&config.layout);
    let (mut engine, sink) = PlaybackEngine::new(
        config,
        Box::new(ScriptedDecoder::new(total_frames)),
        Box::new(store),
    )
    .unwrap();
    engine.load(Path::new("scripted://track")).unwrap();
    (engine, sink)
}

/// Call `fill` until the predicate holds or the deadline passes
fn fill_until(
    sink: &mut RealtimeSink,
    mut predicate: impl FnMut(&[f32]) -> bool,
) -> bool {
    let start = Instant::now();
    let mut buffer = vec![0.0f32; FILL];
    while start.elapsed() < DEADLINE {
        buffer.fill(0.0);
        sink.fill(&mut buffer);
        if predicate(&buffer) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

fn has_audio(buffer: &[f32]) -> bool {
    buffer.iter().any(|&s| s != 0.0)
}

#[test]
fn play_produces_audio_and_advances_position() {
    let (mut engine, mut sink) = engine_with_track(1_000_000);
    engine.play().unwrap();
    assert_eq!(engine.state(), TransportState::Playing);

    assert!(fill_until(&mut sink, has_audio), "no audio reached the sink");
    let p1 = engine.position();
    assert!(fill_until(&mut sink, has_audio));
    assert!(engine.position() >= p1);

    engine.stop().unwrap();
    assert_eq!(engine.state(), TransportState::Stopped);
    assert_eq!(engine.position(), 0);
}

#[test]
fn pause_holds_position_exactly() {
    let (mut engine, mut sink) = engine_with_track(1_000_000);
    engine.play().unwrap();
    assert!(fill_until(&mut sink, has_audio));

    engine.pause().unwrap();
    let paused_at = engine.position();

    // Every fill while paused is silence and consumes nothing
    let mut buffer = vec![1.0f32; FILL];
    for _ in 0..20 {
        sink.fill(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
        assert_eq!(engine.position(), paused_at);
    }

    engine.play().unwrap();
    assert!(fill_until(&mut sink, |_| engine.position() > paused_at));
}

#[test]
fn no_stale_audio_after_seek() {
    let (mut engine, mut sink) = engine_with_track(2_000_000);
    engine.play().unwrap();
    assert!(fill_until(&mut sink, has_audio));

    let target = 750_000;
    engine.seek(target).unwrap();
    assert_eq!(engine.state(), TransportState::Playing);
    assert_eq!(engine.position(), target);

    // No observed position may ever fall before the seek target: a
    // pre-seek frame sneaking through would drag it backwards
    assert!(fill_until(&mut sink, |_| engine.position() > target));
    let start = Instant::now();
    let mut buffer = vec![0.0f32; FILL];
    while start.elapsed() < Duration::from_millis(200) {
        sink.fill(&mut buffer);
        assert!(engine.position() >= target, "stale pre-seek audio observed");
    }
}

#[test]
fn end_of_source_stops_the_session() {
    let (mut engine, mut sink) = engine_with_track(10_000);
    let events = engine.events();
    engine.play().unwrap();

    assert!(fill_until(&mut sink, |_| engine.state()
        == TransportState::Stopped));

    let seen: Vec<EngineEvent> = events.try_iter().collect();
    assert!(
        seen.contains(&EngineEvent::EndOfSource),
        "no EndOfSource event in {seen:?}"
    );
}

#[test]
fn replay_after_end_of_source_starts_clean() {
    let (mut engine, mut sink) = engine_with_track(10_000);
    let events = engine.events();
    engine.play().unwrap();
    assert!(fill_until(&mut sink, |_| engine.state()
        == TransportState::Stopped));
    let _ = events.try_iter().count();

    // A second play must restart from the beginning: fresh audio, no
    // gap reports from the restarted sequence counter, and no
    // immediate re-stop from the previous run's final position
    engine.play().unwrap();
    assert_eq!(engine.state(), TransportState::Playing);
    assert!(fill_until(&mut sink, has_audio), "replay produced no audio");
    assert_eq!(engine.state(), TransportState::Playing);

    let stray = events
        .try_iter()
        .find(|e| matches!(e, EngineEvent::SequenceGap { .. } | EngineEvent::EndOfSource));
    assert_eq!(stray, None, "replay raised {stray:?}");
}

#[test]
fn seek_past_end_is_end_of_source_not_an_error() {
    let (mut engine, _sink) = engine_with_track(10_000);
    let events = engine.events();
    engine.play().unwrap();

    engine.seek(50_000).unwrap();
    assert_eq!(engine.state(), TransportState::Stopped);

    let seen: Vec<EngineEvent> = events.try_iter().collect();
    assert!(seen.contains(&EngineEvent::EndOfSource));
}

#[test]
fn invalid_commands_are_rejected_not_ignored() {
    let (mut engine, _sink) = engine_with_track(10_000);

    assert!(matches!(
        engine.pause(),
        Err(EngineError::InvalidState { command: "pause", .. })
    ));
    assert!(matches!(
        engine.seek(100),
        Err(EngineError::InvalidState { command: "seek", .. })
    ));

    engine.play().unwrap();
    assert!(matches!(
        engine.play(),
        Err(EngineError::InvalidState { command: "play", .. })
    ));
    assert!(matches!(
        engine.load(Path::new("another")),
        Err(EngineError::InvalidState { command: "load", .. })
    ));
}

#[test]
fn play_without_track_is_rejected() {
    let config = EngineConfig::default();
    let (mut engine, _sink) = PlaybackEngine::new(
        config,
        Box::new(ScriptedDecoder::new(1_000)),
        Box::new(MemoryPresetStore::new()),
    )
    .unwrap();

    assert!(matches!(engine.play(), Err(EngineError::NoTrackLoaded)));
    assert!(matches!(engine.seek(0), Err(EngineError::NoTrackLoaded)));
}

#[test]
fn fatal_decode_failure_stops_the_session() {
    let config = EngineConfig::default();
    let (mut engine, _sink) = PlaybackEngine::new(
        config,
        Box::new(FailingDecoder),
        Box::new(MemoryPresetStore::new()),
    )
    .unwrap();
    let events = engine.events();

    engine.load(Path::new("scripted://broken")).unwrap();
    engine.play().unwrap();

    let start = Instant::now();
    while engine.state() != TransportState::Stopped && start.elapsed() < DEADLINE {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(engine.state(), TransportState::Stopped);
    assert!(events
        .try_iter()
        .any(|e| matches!(e, EngineEvent::DecodeFailed { .. })));
}

#[test]
fn decode_failure_flushes_inflight_frames() {
    let config = EngineConfig::default();
    let (mut engine, mut sink) = PlaybackEngine::new(
        config,
        Box::new(FlakyDecoder::new(3)),
        Box::new(MemoryPresetStore::new()),
    )
    .unwrap();

    engine.load(Path::new("scripted://flaky")).unwrap();
    engine.play().unwrap();

    // The failure hits before any fill, so the good blocks are still
    // queued when the session stops
    let start = Instant::now();
    while engine.state() != TransportState::Stopped && start.elapsed() < DEADLINE {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(engine.state(), TransportState::Stopped);

    // Playing again must not surface the pre-failure frames; the
    // decoder fails immediately, so any audio here is stale
    engine.play().unwrap();
    let start = Instant::now();
    let mut buffer = vec![0.0f32; FILL];
    while start.elapsed() < Duration::from_millis(200) {
        sink.fill(&mut buffer);
        assert!(
            buffer.iter().all(|&s| s == 0.0),
            "pre-failure audio surfaced after restart"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn band_reconfiguration_only_while_stopped() {
    let (mut engine, _sink) = engine_with_track(100_000);

    engine.play().unwrap();
    assert!(matches!(
        engine.set_layout(BandLayout::ten_band()),
        Err(EngineError::Core(CoreError::Configuration(_)))
    ));

    engine.stop().unwrap();
    engine.set_layout(BandLayout::ten_band()).unwrap();
    assert_eq!(engine.gains().len(), 10);
    assert_eq!(engine.band_energy().len(), 10);

    // Gain operations now validate against the new band count
    assert!(engine.set_gain(BandId(9), 3.0).is_ok());
    assert!(engine.set_gains(GainVector::from_db(vec![0.0; 3])).is_err());
}

#[test]
fn preset_application_is_idempotent() {
    let (engine, _sink) = engine_with_track(10_000);

    engine.apply_preset("Bass Boost").unwrap();
    let once = engine.gains();
    engine.apply_preset("Bass Boost").unwrap();
    let twice = engine.gains();

    assert_eq!(*once, *twice);
}

#[test]
fn preset_save_apply_delete_roundtrip() {
    let (engine, _sink) = engine_with_track(10_000);

    engine.set_gain(BandId(0), 4.5).unwrap();
    engine.save_preset("My Curve").unwrap();

    engine.set_gain(BandId(0), 0.0).unwrap();
    engine.apply_preset("My Curve").unwrap();
    assert_eq!(engine.gains().get(BandId(0)), Some(4.5));

    engine.delete_preset("My Curve").unwrap();
    assert!(engine.apply_preset("My Curve").is_err());
    assert!(engine.delete_preset("My Curve").is_err());
}

#[test]
fn mismatched_gain_vector_is_rejected() {
    let (engine, _sink) = engine_with_track(10_000);
    assert!(engine.set_gains(GainVector::from_db(vec![0.0; 10])).is_err());
    assert!(engine.set_gain(BandId(9), 3.0).is_err());
}

#[test]
fn gain_snapshots_are_never_torn() {
    let (engine, _sink) = engine_with_track(10_000);
    let engine = Arc::new(engine);

    // Writer publishes uniform sentinel vectors; any torn read shows
    // up as a mixed vector
    std::thread::scope(|scope| {
        let writer = Arc::clone(&engine);
        scope.spawn(move || {
            for i in 0..5_000u32 {
                let v = (i % 48) as f32 - 24.0;
                writer.set_gains(GainVector::from_db(vec![v; 3])).unwrap();
            }
        });

        let reader = Arc::clone(&engine);
        scope.spawn(move || {
            for _ in 0..5_000 {
                let snapshot = reader.gains();
                let gains = snapshot.as_db();
                assert!(
                    gains.iter().all(|&g| g == gains[0]),
                    "torn gain vector: {gains:?}"
                );
            }
        });
    });
}

#[test]
fn band_energy_reflects_playback() {
    let (mut engine, mut sink) = engine_with_track(1_000_000);
    engine.play().unwrap();
    assert!(fill_until(&mut sink, has_audio));

    let energy = engine.band_energy();
    assert_eq!(energy.len(), 3);
    // A constant (DC-heavy) source concentrates energy in the bass band
    assert!(energy.iter().any(|&e| e > 0.0));
}
