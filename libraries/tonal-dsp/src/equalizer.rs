//! Multi-band equalizer engine
//!
//! Applies a per-band gain vector to audio frames: split through the
//! crossover [`FilterBank`], scale each band, sum back, clip. Also
//! tracks per-band RMS energy of the most recent frame for level
//! visualization.

use tonal_core::{AudioFrame, BandLayout, CoreError, GainVector, Result, SampleRate};

use crate::filter_bank::FilterBank;

/// Hard output ceiling applied after band summation
///
/// Large boosts can push the sum outside [-1, 1]; samples are clipped
/// at this limit rather than wrapped or scaled.
pub const CLIP_LIMIT: f32 = 1.0;

/// Convert a gain in decibels to a linear amplitude factor
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Stateful equalizer processing frames in place
///
/// Owned by the equalize context; one instance per playback session.
/// Filter state persists across frames and is cleared via
/// [`Equalizer::reset`] on stop and after seeks.
pub struct Equalizer {
    bank: FilterBank,
    /// RMS per band of the last processed frame, in band order
    band_energy: Vec<f32>,
}

impl Equalizer {
    /// Build an equalizer for a band layout at a sample rate
    ///
    /// # Errors
    /// Returns `InvalidInput` if a crossover edge is at or above Nyquist.
    pub fn new(layout: &BandLayout, sample_rate: SampleRate) -> Result<Self> {
        let bank = FilterBank::new(layout, sample_rate)?;
        Ok(Self {
            band_energy: vec![0.0; bank.num_bands()],
            bank,
        })
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.bank.num_bands()
    }

    /// Apply the gain vector to a frame in place
    ///
    /// # Errors
    /// Returns `Configuration` if the gain vector's band count does not
    /// match the layout the equalizer was built for.
    pub fn process(&mut self, frame: &mut AudioFrame, gains: &GainVector) -> Result<()> {
        if gains.len() != self.bank.num_bands() {
            return Err(CoreError::configuration(format!(
                "gain vector has {} bands, equalizer has {}",
                gains.len(),
                self.bank.num_bands()
            )));
        }
        if frame.is_empty() {
            return Ok(());
        }

        self.bank.split(&frame.samples);

        frame.samples.fill(0.0);
        for (i, &db) in gains.as_db().iter().enumerate() {
            let linear = db_to_linear(db);
            let band = self.bank.band(i);

            let mut energy = 0.0f32;
            for (out, &s) in frame.samples.iter_mut().zip(band) {
                let scaled = s * linear;
                energy += scaled * scaled;
                *out += scaled;
            }
            self.band_energy[i] = (energy / band.len() as f32).sqrt();
        }

        for sample in &mut frame.samples {
            *sample = sample.clamp(-CLIP_LIMIT, CLIP_LIMIT);
        }
        Ok(())
    }

    /// Per-band RMS of the most recently processed frame (post-gain)
    pub fn band_energy(&self) -> &[f32] {
        &self.band_energy
    }

    /// Clear all filter state and energy readings
    pub fn reset(&mut self) {
        self.bank.reset();
        self.band_energy.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use tonal_core::{AudioSpec, BandId};

    fn sine_frame(frequency: f32, frames: usize, amplitude: f32) -> AudioFrame {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let s = amplitude * (2.0 * PI * frequency * i as f32 / 44_100.0).sin();
            samples.push(s);
            samples.push(s);
        }
        AudioFrame::new(samples, AudioSpec::cd_stereo(), 0, 0, 0)
    }

    fn rms(samples: &[f32]) -> f32 {
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        (sum / samples.len() as f32).sqrt()
    }

    #[test]
    fn db_conversion() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(6.0) - 1.9953).abs() < 1e-3);
        assert!((db_to_linear(-6.0) - 0.5012).abs() < 1e-3);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn flat_gains_preserve_level() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::flat(&layout);

        let mut frame = sine_frame(1_000.0, 16_384, 0.5);
        let in_rms = rms(&frame.samples[8_192..]);
        eq.process(&mut frame, &gains).unwrap();
        let out_rms = rms(&frame.samples[8_192..]);

        let ratio = out_rms / in_rms;
        assert!((ratio - 1.0).abs() < 0.1, "flat ratio {ratio}");
    }

    #[test]
    fn boost_raises_in_band_level() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let mut gains = GainVector::flat(&layout);
        gains.set(BandId(1), 6.0).unwrap();

        // 1 kHz sits in the mid band; a +6 dB boost roughly doubles it
        let mut frame = sine_frame(1_000.0, 16_384, 0.25);
        let in_rms = rms(&frame.samples[8_192..]);
        eq.process(&mut frame, &gains).unwrap();
        let out_rms = rms(&frame.samples[8_192..]);

        let ratio = out_rms / in_rms;
        assert!((ratio - 2.0).abs() < 0.25, "boost ratio {ratio}");
    }

    #[test]
    fn cut_lowers_in_band_level() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let mut gains = GainVector::flat(&layout);
        gains.set(BandId(1), -12.0).unwrap();

        let mut frame = sine_frame(1_000.0, 16_384, 0.5);
        let in_rms = rms(&frame.samples[8_192..]);
        eq.process(&mut frame, &gains).unwrap();
        let out_rms = rms(&frame.samples[8_192..]);

        let ratio = out_rms / in_rms;
        assert!((ratio - 0.25).abs() < 0.08, "cut ratio {ratio}");
    }

    #[test]
    fn out_of_band_signal_unaffected_by_boost() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let mut gains = GainVector::flat(&layout);
        // Boost bass; a 10 kHz tone lives in the treble band
        gains.set(BandId(0), 12.0).unwrap();

        let mut frame = sine_frame(10_000.0, 16_384, 0.5);
        let in_rms = rms(&frame.samples[8_192..]);
        eq.process(&mut frame, &gains).unwrap();
        let out_rms = rms(&frame.samples[8_192..]);

        let ratio = out_rms / in_rms;
        assert!((ratio - 1.0).abs() < 0.1, "out-of-band ratio {ratio}");
    }

    #[test]
    fn output_is_clipped_to_limit() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::from_db(vec![24.0, 24.0, 24.0]);

        let mut frame = sine_frame(1_000.0, 8_192, 0.9);
        eq.process(&mut frame, &gains).unwrap();

        assert!(frame
            .samples
            .iter()
            .all(|&s| (-CLIP_LIMIT..=CLIP_LIMIT).contains(&s)));
        // A 0.9 amplitude tone boosted 24 dB must actually hit the ceiling
        assert!(frame.samples.iter().any(|&s| s.abs() == CLIP_LIMIT));
    }

    #[test]
    fn three_way_tilt_leaves_mid_tone_at_unity() {
        // Bass boosted, treble cut: a 1 kHz tone lives in the mid band
        // and must come out at the same level as with all-flat gains
        let layout = BandLayout::three_way();
        let gains = GainVector::from_db(vec![6.0, 0.0, -6.0]);

        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let mut frame = sine_frame(1_000.0, 16_384, 0.5);
        eq.process(&mut frame, &gains).unwrap();
        let tilted_rms = rms(&frame.samples[8_192..]);

        let mut eq_flat = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let mut frame = sine_frame(1_000.0, 16_384, 0.5);
        eq_flat
            .process(&mut frame, &GainVector::flat(&layout))
            .unwrap();
        let flat_rms = rms(&frame.samples[8_192..]);

        let ratio = tilted_rms / flat_rms;
        assert!((ratio - 1.0).abs() < 0.1, "mid tone moved by {ratio}");
    }

    #[test]
    fn band_energy_tracks_active_band() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::flat(&layout);

        let mut frame = sine_frame(1_000.0, 16_384, 0.5);
        eq.process(&mut frame, &gains).unwrap();

        let energy = eq.band_energy();
        assert_eq!(energy.len(), 3);
        assert!(energy[1] > energy[0]);
        assert!(energy[1] > energy[2]);
    }

    #[test]
    fn rejects_mismatched_gain_vector() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::from_db(vec![0.0; 10]);

        let mut frame = sine_frame(1_000.0, 512, 0.5);
        assert!(eq.process(&mut frame, &gains).is_err());
    }

    #[test]
    fn empty_frame_is_a_noop() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::flat(&layout);

        let mut frame = AudioFrame::new(Vec::new(), AudioSpec::cd_stereo(), 0, 0, 0);
        eq.process(&mut frame, &gains).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn reset_clears_energy() {
        let layout = BandLayout::three_way();
        let mut eq = Equalizer::new(&layout, SampleRate::CD_QUALITY).unwrap();
        let gains = GainVector::flat(&layout);

        let mut frame = sine_frame(1_000.0, 4_096, 0.5);
        eq.process(&mut frame, &gains).unwrap();
        assert!(eq.band_energy().iter().any(|&e| e > 0.0));

        eq.reset();
        assert!(eq.band_energy().iter().all(|&e| e == 0.0));
    }
}
