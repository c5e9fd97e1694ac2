//! Tonal DSP
//!
//! Filter bank and equalizer engine for the Tonal playback pipeline.
//!
//! This crate provides:
//! - A Linkwitz-Riley crossover filter bank splitting stereo audio into
//!   frequency bands that sum back flat (near-perfect reconstruction)
//! - An equalizer engine applying per-band gain with a hard-clip
//!   saturation policy and per-band energy metering
//!
//! All processing operates on interleaved stereo f32 samples in the
//! [-1.0, 1.0] range and is deterministic given identical starting
//! filter state.
//!
//! # Example
//!
//! ```rust
//! use tonal_core::{AudioFrame, AudioSpec, BandLayout, GainVector, SampleRate};
//! use tonal_dsp::Equalizer;
//!
//! let layout = BandLayout::three_way();
//! let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
//!
//! let gains = GainVector::from_db(vec![6.0, 0.0, -6.0]);
//! let samples = vec![0.0f32; 1024]; // interleaved stereo
//! let mut frame = AudioFrame::new(samples, AudioSpec::cd_stereo(), 0, 0, 0);
//! eq.process(&mut frame, &gains).unwrap();
//! ```

#![forbid(unsafe_code)]

mod biquad;
mod equalizer;
mod filter_bank;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use equalizer::{db_to_linear, Equalizer, CLIP_LIMIT};
pub use filter_bank::FilterBank;
