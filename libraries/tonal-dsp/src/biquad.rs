//! Stereo biquad filter section
//!
//! Direct form I with per-channel delay lines, used as the building
//! block for the crossover filter bank. Coefficients follow the RBJ
//! audio EQ cookbook.

use std::f32::consts::PI;

/// Butterworth Q for a single 2nd-order section
pub(crate) const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// One biquad section with stereo state
#[derive(Debug, Clone)]
pub(crate) struct Biquad {
    // Coefficients (a0-normalized)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // State (stereo)
    x1_l: f32,
    x2_l: f32,
    y1_l: f32,
    y2_l: f32,
    x1_r: f32,
    x2_r: f32,
    y1_r: f32,
    y2_r: f32,
}

/// Clamp frequency to 45% of sample rate to prevent near-Nyquist instability
fn clamp_frequency(frequency: f32, sample_rate: f32) -> f32 {
    frequency.min(sample_rate * 0.45)
}

impl Biquad {
    fn with_coefficients(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            x1_l: 0.0,
            x2_l: 0.0,
            y1_l: 0.0,
            y2_l: 0.0,
            x1_r: 0.0,
            x2_r: 0.0,
            y1_r: 0.0,
            y2_r: 0.0,
        }
    }

    /// Pass-through section (unity coefficients)
    pub(crate) fn identity() -> Self {
        Self::with_coefficients(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// 2nd-order Butterworth low-pass at `frequency`
    pub(crate) fn lowpass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        if sample_rate < 1.0 {
            return Self::identity();
        }
        let omega = 2.0 * PI * clamp_frequency(frequency, sample_rate) / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let b1 = 1.0 - cos_omega;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::with_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// 2nd-order Butterworth high-pass at `frequency`
    pub(crate) fn highpass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        if sample_rate < 1.0 {
            return Self::identity();
        }
        let omega = 2.0 * PI * clamp_frequency(frequency, sample_rate) / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::with_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// 2nd-order all-pass at `frequency`
    ///
    /// Matches the phase response of a Linkwitz-Riley crossover at the
    /// same frequency, used to keep already-split bands aligned with
    /// bands that pass through later crossover points.
    pub(crate) fn allpass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        if sample_rate < 1.0 {
            return Self::identity();
        }
        let omega = 2.0 * PI * clamp_frequency(frequency, sample_rate) / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = 1.0 - alpha;
        let b1 = -2.0 * cos_omega;
        let b2 = 1.0 + alpha;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::with_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// Process one stereo sample pair
    #[inline]
    pub(crate) fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut out_l = self.b0 * left + self.b1 * self.x1_l + self.b2 * self.x2_l
            - self.a1 * self.y1_l
            - self.a2 * self.y2_l;

        // Flush denormals to zero to prevent CPU performance issues
        if out_l.abs() < 1e-15 {
            out_l = 0.0;
        }

        self.x2_l = self.x1_l;
        self.x1_l = left;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let mut out_r = self.b0 * right + self.b1 * self.x1_r + self.b2 * self.x2_r
            - self.a1 * self.y1_r
            - self.a2 * self.y2_r;

        if out_r.abs() < 1e-15 {
            out_r = 0.0;
        }

        self.x2_r = self.x1_r;
        self.x1_r = right;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l, out_r)
    }

    /// Clear the delay lines
    pub(crate) fn reset(&mut self) {
        self.x1_l = 0.0;
        self.x2_l = 0.0;
        self.y1_l = 0.0;
        self.y2_l = 0.0;
        self.x1_r = 0.0;
        self.x2_r = 0.0;
        self.y1_r = 0.0;
        self.y2_r = 0.0;
    }
}
