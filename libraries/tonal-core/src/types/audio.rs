//! Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    /// DVD / broadcast rate
    pub const DVD_QUALITY: Self = Self(48_000);
    /// High-resolution 96 kHz
    pub const HIGH_RES_96: Self = Self(96_000);
    /// High-resolution 192 kHz
    pub const HIGH_RES_192: Self = Self(192_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }

    /// Get the Nyquist frequency (half the sample rate)
    pub fn nyquist_hz(&self) -> f32 {
        self.0 as f32 / 2.0
    }
}

/// Stream format tag carried by every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of channels (the pipeline processes interleaved stereo)
    pub channels: u16,
}

impl AudioSpec {
    /// Create a new audio spec
    pub fn new(sample_rate: SampleRate, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// CD quality stereo (44.1 kHz, 2 channels)
    pub fn cd_stereo() -> Self {
        Self {
            sample_rate: SampleRate::CD_QUALITY,
            channels: 2,
        }
    }
}

/// A fixed-size block of decoded audio flowing through the pipeline
///
/// Samples are interleaved f32 in the range [-1.0, 1.0]: `[L, R, L, R, ...]`.
/// Each frame carries three tags:
/// - `seq`: monotonically increasing per producer, used by consumers to
///   detect dropped frames (a gap is a recoverable underrun event),
/// - `position`: source sample index of the first sample pair, used for
///   playback position tracking and stale-audio detection after seek,
/// - `generation`: flush epoch; frames tagged with an older generation
///   than the current one are discarded by every consumer.
///
/// A frame is owned by exactly one pipeline stage at a time; ownership
/// transfers on enqueue/dequeue.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Interleaved samples
    pub samples: Vec<f32>,

    /// Stream format
    pub spec: AudioSpec,

    /// Producer sequence number
    pub seq: u64,

    /// Source sample index of the first sample pair
    pub position: u64,

    /// Flush epoch this frame belongs to
    pub generation: u64,
}

impl AudioFrame {
    /// Create a new frame
    pub fn new(samples: Vec<f32>, spec: AudioSpec, seq: u64, position: u64, generation: u64) -> Self {
        Self {
            samples,
            spec,
            seq,
            position,
            generation,
        }
    }

    /// Number of frames (sample pairs for stereo)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels as usize
    }

    /// Length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Source sample index one past the last sample pair
    pub fn end_position(&self) -> u64 {
        self.position + self.frames() as u64
    }
}
