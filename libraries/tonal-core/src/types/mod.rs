//! Core domain types

mod audio;
mod band;
mod transport;

pub use audio::{AudioFrame, AudioSpec, SampleRate};
pub use band::{Band, BandId, BandLayout, GainVector, Preset, GAIN_MAX_DB, GAIN_MIN_DB};
pub use transport::TransportState;
