//! Test signal generation for DSP verification
//!
//! Standard signals used by the equalizer quality tests:
//! - Sine waves (single frequency)
//! - Logarithmic sine sweeps (chirp signals)
//! - White noise
//!
//! All generators produce stereo interleaved samples (L, R, L, R, ...).

use std::f32::consts::PI;

/// Generate a sine wave
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_sine_wave(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_samples * 2);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency * t).sin() * amplitude;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate a logarithmic sine sweep (chirp)
///
/// Useful for checking the frequency response across the audible
/// spectrum in one pass.
///
/// # Arguments
/// * `start_freq` - Starting frequency in Hz
/// * `end_freq` - Ending frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_sine_sweep(
    start_freq: f32,
    end_freq: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_samples * 2);

    let k = (end_freq / start_freq).ln() / duration;

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let phase = 2.0 * PI * start_freq * ((k * t).exp() - 1.0) / k;
        let sample = phase.sin() * amplitude;
        samples.push(sample);
        samples.push(sample);
    }

    samples
}

/// Generate white noise
///
/// # Arguments
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_white_noise(sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_samples * 2);

    for _ in 0..num_samples {
        let sample = (rand::random::<f32>() * 2.0 - 1.0) * amplitude;
        samples.push(sample);
        samples.push(sample);
    }

    samples
}

/// Compute the RMS level of a sample slice
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Peak absolute sample value
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_wave_properties() {
        let samples = generate_sine_wave(440.0, 44_100, 0.1, 0.8);
        assert_eq!(samples.len(), 4_410 * 2);
        assert!(peak_level(&samples) <= 0.8 + 1e-6);
        // RMS of a sine is amplitude / sqrt(2)
        assert!((rms_level(&samples) - 0.8 / 2.0_f32.sqrt()).abs() < 0.01);
    }

    #[test]
    fn sweep_stays_in_range() {
        let samples = generate_sine_sweep(20.0, 20_000.0, 44_100, 0.5, 1.0);
        assert!(peak_level(&samples) <= 1.0 + 1e-6);
        assert!(rms_level(&samples) > 0.5);
    }

    #[test]
    fn white_noise_amplitude_bound() {
        let samples = generate_white_noise(44_100, 0.1, 0.5);
        assert!(peak_level(&samples) <= 0.5);
        assert!(rms_level(&samples) > 0.1);
    }
}
