//! Linkwitz-Riley crossover filter bank
//!
//! Splits interleaved stereo audio into N frequency bands using LR4
//! crossovers (two cascaded 2nd-order Butterworth sections per path,
//! 24 dB/oct slopes). Bands that were peeled off at earlier crossover
//! points pass through 2nd-order all-pass sections at each later
//! crossover frequency, keeping all bands phase-aligned so their sum
//! reconstructs the input flat in magnitude.

use tonal_core::{Band, BandLayout, Result, SampleRate};

use crate::biquad::{Biquad, BUTTERWORTH_Q};

/// Low-pass/high-pass LR4 pair for one crossover point
#[derive(Debug, Clone)]
struct CrossoverSplit {
    lp: [Biquad; 2],
    hp: [Biquad; 2],
}

impl CrossoverSplit {
    fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            lp: [
                Biquad::lowpass(sample_rate, frequency, BUTTERWORTH_Q),
                Biquad::lowpass(sample_rate, frequency, BUTTERWORTH_Q),
            ],
            hp: [
                Biquad::highpass(sample_rate, frequency, BUTTERWORTH_Q),
                Biquad::highpass(sample_rate, frequency, BUTTERWORTH_Q),
            ],
        }
    }

    fn reset(&mut self) {
        for f in &mut self.lp {
            f.reset();
        }
        for f in &mut self.hp {
            f.reset();
        }
    }
}

/// N-band crossover filter bank with carried-over filter state
///
/// Filters are stateful IIR sections: consecutive calls to
/// [`FilterBank::split`] continue seamlessly across frame boundaries.
/// Band reconfiguration means building a new bank; the playback engine
/// only permits that while stopped. [`FilterBank::reset`] clears all
/// delay lines to silence and is called on stop and after seeks so no
/// filter tail from the old position bleeds into the new one.
pub struct FilterBank {
    bands: Vec<Band>,
    sample_rate: SampleRate,
    splits: Vec<CrossoverSplit>,
    /// Phase-correction sections: `allpass[i]` holds one all-pass per
    /// crossover point above band `i`
    allpass: Vec<Vec<Biquad>>,
    /// Per-band output buffers (interleaved stereo), reused across calls
    outputs: Vec<Vec<f32>>,
    /// High-pass remainder scratch
    remainder: Vec<f32>,
}

impl FilterBank {
    /// Build a filter bank for a layout at a sample rate
    ///
    /// # Errors
    /// Returns `InvalidInput` if a crossover edge is at or above Nyquist.
    pub fn new(layout: &BandLayout, sample_rate: SampleRate) -> Result<Self> {
        let bands = layout.bands(sample_rate)?;
        let sr = sample_rate.as_hz() as f32;
        let edges = layout.edges();

        let splits = edges
            .iter()
            .map(|&edge| CrossoverSplit::new(sr, edge))
            .collect();

        // Band i was peeled off at edge i; it needs one all-pass for
        // every later edge. The last band passes through every edge's
        // high-pass path and needs none.
        let allpass = (0..bands.len())
            .map(|i| {
                edges
                    .iter()
                    .skip(i + 1)
                    .map(|&edge| Biquad::allpass(sr, edge, BUTTERWORTH_Q))
                    .collect()
            })
            .collect();

        Ok(Self {
            outputs: vec![Vec::new(); bands.len()],
            remainder: Vec::new(),
            bands,
            sample_rate,
            splits,
            allpass,
        })
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Band definitions, ordered by ascending frequency
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Sample rate the bank was built for
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Split a frame of interleaved stereo samples into per-band signals
    ///
    /// Fills the internal band buffers (each the same length as the
    /// input, retrievable via [`FilterBank::band`]) and carries filter
    /// state forward for the next call. The input length must be even.
    pub fn split(&mut self, input: &[f32]) {
        debug_assert!(input.len() % 2 == 0, "interleaved stereo expected");

        self.remainder.clear();
        self.remainder.extend_from_slice(input);

        let num_splits = self.splits.len();
        for k in 0..num_splits {
            let split = &mut self.splits[k];
            let out = &mut self.outputs[k];
            out.clear();
            out.resize(input.len(), 0.0);

            for (i, pair) in self.remainder.chunks_exact_mut(2).enumerate() {
                let (l, r) = (pair[0], pair[1]);

                let (ll, lr) = split.lp[0].process(l, r);
                let (ll, lr) = split.lp[1].process(ll, lr);
                out[2 * i] = ll;
                out[2 * i + 1] = lr;

                let (hl, hr) = split.hp[0].process(l, r);
                let (hl, hr) = split.hp[1].process(hl, hr);
                pair[0] = hl;
                pair[1] = hr;
            }

            // Phase-align the bands peeled off before this crossover point
            for i in 0..k {
                let ap = &mut self.allpass[i][k - i - 1];
                for pair in self.outputs[i].chunks_exact_mut(2) {
                    let (l, r) = ap.process(pair[0], pair[1]);
                    pair[0] = l;
                    pair[1] = r;
                }
            }
        }

        let last = self.outputs.len() - 1;
        self.outputs[last].clear();
        self.outputs[last].extend_from_slice(&self.remainder);
    }

    /// Output buffer for band `index` from the most recent `split` call
    pub fn band(&self, index: usize) -> &[f32] {
        &self.outputs[index]
    }

    /// Clear all delay lines to silence
    pub fn reset(&mut self) {
        for split in &mut self.splits {
            split.reset();
        }
        for band in &mut self.allpass {
            for ap in band {
                ap.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_stereo(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let s = (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin();
            samples.push(s);
            samples.push(s);
        }
        samples
    }

    fn rms(samples: &[f32]) -> f32 {
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        (sum / samples.len() as f32).sqrt()
    }

    fn bank_3way() -> FilterBank {
        FilterBank::new(&BandLayout::three_way(), SampleRate::CD_QUALITY).unwrap()
    }

    #[test]
    fn split_preserves_frame_length() {
        let mut bank = bank_3way();
        let input = sine_stereo(440.0, 44_100, 512);
        bank.split(&input);

        for i in 0..bank.num_bands() {
            assert_eq!(bank.band(i).len(), input.len());
        }
    }

    #[test]
    fn sine_lands_in_its_band() {
        let mut bank = bank_3way();
        let input = sine_stereo(1_000.0, 44_100, 16_384);
        bank.split(&input);

        // 1 kHz sits in the mid band (200 Hz - 5 kHz); with 24 dB/oct
        // slopes the outer bands are far down
        let steady = 8_192..;
        let low = rms(&bank.band(0)[steady.clone()]);
        let mid = rms(&bank.band(1)[steady.clone()]);
        let high = rms(&bank.band(2)[steady]);

        assert!(mid > 20.0 * low, "mid {mid} vs low {low}");
        assert!(mid > 20.0 * high, "mid {mid} vs high {high}");
    }

    #[test]
    fn band_sum_reconstructs_input() {
        let mut bank = bank_3way();

        for &frequency in &[100.0, 1_000.0, 8_000.0] {
            bank.reset();
            let input = sine_stereo(frequency, 44_100, 16_384);
            bank.split(&input);

            let mut sum = vec![0.0f32; input.len()];
            for b in 0..bank.num_bands() {
                for (acc, &s) in sum.iter_mut().zip(bank.band(b)) {
                    *acc += s;
                }
            }

            // The sum is all-pass relative to the input: compare
            // steady-state magnitudes, not waveforms
            let in_rms = rms(&input[8_192..]);
            let out_rms = rms(&sum[8_192..]);
            let ratio = out_rms / in_rms;
            assert!(
                (ratio - 1.0).abs() < 0.1,
                "reconstruction ratio {ratio} at {frequency} Hz"
            );
        }
    }

    #[test]
    fn state_carries_across_frames() {
        // Splitting one long frame must equal splitting it in chunks
        let input = sine_stereo(440.0, 44_100, 2_048);

        let mut whole = bank_3way();
        whole.split(&input);
        let whole_band0 = whole.band(0).to_vec();

        let mut chunked = bank_3way();
        let mut band0 = Vec::new();
        for chunk in input.chunks(512) {
            chunked.split(chunk);
            band0.extend_from_slice(chunked.band(0));
        }

        for (a, b) in whole_band0.iter().zip(&band0) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn reset_clears_filter_tails() {
        let mut bank = bank_3way();
        let input = sine_stereo(440.0, 44_100, 1_024);
        bank.split(&input);

        bank.reset();
        let silence = vec![0.0f32; 512];
        bank.split(&silence);

        for i in 0..bank.num_bands() {
            assert!(bank.band(i).iter().all(|&s| s == 0.0), "tail in band {i}");
        }
    }

    #[test]
    fn rejects_edge_above_nyquist() {
        let layout = BandLayout::new(vec![30_000.0]).unwrap();
        assert!(FilterBank::new(&layout, SampleRate::CD_QUALITY).is_err());
    }

    #[test]
    fn ten_band_split() {
        let mut bank =
            FilterBank::new(&BandLayout::ten_band(), SampleRate::CD_QUALITY).unwrap();
        assert_eq!(bank.num_bands(), 10);

        let input = sine_stereo(1_000.0, 44_100, 4_096);
        bank.split(&input);
        for i in 0..10 {
            assert_eq!(bank.band(i).len(), input.len());
        }
    }
}
