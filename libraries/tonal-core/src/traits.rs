//! Collaborator traits for the Tonal engine
use crate::error::Result;
use crate::types::{Preset, SampleRate};
use std::path::Path;

/// Stream properties reported when a source is opened
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Source sample rate
    pub sample_rate: SampleRate,

    /// Source channel count (before stereo conversion)
    pub channels: u16,

    /// Total length in sample frames, if the container reports one
    pub total_frames: Option<u64>,
}

/// A block of decoded samples returned by the decode collaborator
///
/// Samples are interleaved stereo f32 in [-1.0, 1.0]; `position` is the
/// source sample index of the first sample pair.
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,

    /// Source sample index of the first sample pair
    pub position: u64,
}

/// Decode collaborator contract
///
/// The engine never interprets container or codec formats itself; it
/// drives an implementation of this trait from the decode worker. The
/// default implementation is Symphonia-backed, but any source of raw
/// PCM frames fits (test harnesses use scripted implementations).
pub trait AudioDecoder: Send {
    /// Open a source and report its stream properties
    ///
    /// # Errors
    /// Returns a `Decode` error if the source cannot be opened or probed.
    fn open(&mut self, path: &Path) -> Result<StreamInfo>;

    /// Decode up to `max_frames` sample pairs
    ///
    /// Returns `None` at end of source. A returned block may be shorter
    /// than `max_frames` near the end of the source.
    ///
    /// # Errors
    /// Returns a `Decode` error if no source is open or decoding fails.
    fn read_frame(&mut self, max_frames: usize) -> Result<Option<DecodedBlock>>;

    /// Seek to a sample position
    ///
    /// Returns the actual position after seeking, which may differ from
    /// the request at packet boundaries in compressed formats.
    ///
    /// # Errors
    /// Returns a `Decode` error if no source is open or the seek fails.
    fn seek(&mut self, sample_position: u64) -> Result<u64>;

    /// Close the current source, if any
    fn close(&mut self);
}

/// Preset storage collaborator contract
///
/// Durable storage is owned by the collaborator; the engine treats
/// presets as immutable values once loaded.
pub trait PresetStore: Send {
    /// Load all stored presets
    ///
    /// # Errors
    /// Returns a `Storage` error if the backing store cannot be read.
    fn load_all(&self) -> Result<Vec<Preset>>;

    /// Save a preset, replacing any preset with the same name
    ///
    /// # Errors
    /// Returns a `Storage` error if the preset cannot be persisted.
    fn save(&mut self, preset: &Preset) -> Result<()>;

    /// Delete a preset by name
    ///
    /// # Errors
    /// Returns a `Storage` error if no such preset exists or deletion fails.
    fn delete(&mut self, name: &str) -> Result<()>;
}
