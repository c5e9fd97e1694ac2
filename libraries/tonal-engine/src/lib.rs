//! Tonal Engine
//!
//! Streaming playback pipeline with real-time multi-band equalization.
//!
//! The pipeline runs across four execution contexts:
//! - **Control**: [`PlaybackEngine`] methods (transport commands, gain
//!   changes, presets)
//! - **Decode worker**: drives the [`tonal_core::AudioDecoder`]
//!   collaborator, paced by raw-queue backpressure
//! - **Equalize worker**: owns the filter state, applies one gain
//!   snapshot per frame
//! - **Real-time output**: [`RealtimeSink::fill`], invoked from the
//!   device callback; never blocks, never allocates, degrades to
//!   silence
//!
//! The stages communicate only through bounded SPSC frame queues and
//! atomic shared state. [`CpalOutput`] (feature `desktop`) binds the
//! sink to the default audio device; test harnesses drive the sink
//! directly.
//!
//! ```rust,no_run
//! use tonal_engine::{EngineConfig, PlaybackEngine};
//!
//! # fn main() -> Result<(), tonal_engine::EngineError> {
//! let (mut engine, sink) = PlaybackEngine::with_defaults(EngineConfig::default())?;
//! engine.load(std::path::Path::new("track.flac"))?;
//! engine.play()?;
//! // drive `sink` from an output device callback
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod config;
mod decode;
mod engine;
mod error;
mod events;
mod presets;
mod queue;
mod sink;
mod transport;

#[cfg(feature = "desktop")]
mod output;

pub use config::EngineConfig;
pub use decode::SymphoniaDecoder;
pub use engine::PlaybackEngine;
pub use error::{EngineError, Result};
pub use events::EngineEvent;
pub use presets::{factory_presets, MemoryPresetStore};
pub use queue::{FrameConsumer, FrameProducer, FrameQueue, Pop, PushError};
pub use sink::RealtimeSink;
pub use transport::Transport;

#[cfg(feature = "desktop")]
pub use output::CpalOutput;
