//! Tonal Core
//!
//! Platform-agnostic types, traits, and error handling for the Tonal
//! playback engine.
//!
//! This crate defines:
//! - **Domain Types**: `Band`, `BandLayout`, `GainVector`, `Preset`,
//!   `AudioFrame`, `TransportState`
//! - **Collaborator Traits**: `AudioDecoder`, `PresetStore`
//! - **Error Handling**: unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use tonal_core::{BandLayout, GainVector};
//!
//! // Three-way split: bass below 200 Hz, mids to 5 kHz, treble above
//! let layout = BandLayout::three_way();
//! assert_eq!(layout.len(), 3);
//!
//! // All bands flat by default
//! let gains = GainVector::flat(&layout);
//! assert!(gains.iter().all(|(_, db)| db == 0.0));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use traits::{AudioDecoder, DecodedBlock, PresetStore, StreamInfo};
pub use types::{
    AudioFrame, AudioSpec, Band, BandId, BandLayout, GainVector, Preset, SampleRate,
    TransportState, GAIN_MAX_DB, GAIN_MIN_DB,
};
