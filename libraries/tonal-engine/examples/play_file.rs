//! Play an audio file through the default output device with a
//! three-way EQ.
//!
//! Usage: `cargo run -p tonal-engine --features desktop --example play_file -- <file>`

use std::path::Path;

use tonal_core::AudioSpec;
use tonal_engine::{CpalOutput, EngineConfig, EngineEvent, PlaybackEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: play_file <audio-file>")?;

    let (mut engine, sink) = PlaybackEngine::with_defaults(EngineConfig::default())?;
    let info = engine.load(Path::new(&path))?;
    println!(
        "Loaded {} ({} Hz, {:?} frames)",
        path,
        info.sample_rate.as_hz(),
        info.total_frames
    );

    let _output = CpalOutput::start(sink, AudioSpec::new(info.sample_rate, 2), &engine)?;

    // Mild V-shape to show the EQ doing something
    engine.apply_preset("V-Shape")?;
    engine.play()?;

    let events = engine.events();
    loop {
        match events.recv()? {
            EngineEvent::EndOfSource => {
                println!("Done.");
                break;
            }
            EngineEvent::Underrun { missing } => {
                eprintln!("underrun: {missing} samples of silence");
            }
            event => println!("{event:?}"),
        }
    }
    Ok(())
}
