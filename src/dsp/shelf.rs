//! # One-Pole High-Shelf Filter
//!
//! Real rooms swallow high frequencies faster than low ones. A stage can
//! put this filter in front of its allpass chain so that each trip around
//! a feedback loop comes back a little darker.
//!
//! ## Shelf, Not Lowpass
//!
//! A lowpass keeps cutting further and further above its cutoff. A shelf
//! flattens out: below the cutoff the gain is 0 dB, far above it the gain
//! settles at `G`:
//!
//! ```text
//! H(z = 1)  = 1     (DC passes untouched)
//! H(z = -1) = G     (Nyquist is scaled by G = 10^(dB/20))
//! ```
//!
//! ## The Coefficients
//!
//! Bilinear-transform design with a prewarped cutoff:
//!
//! ```text
//! G    = 10^(dB / 20)
//! K    = tan(π * cutoff / sample_rate)
//! norm = 1 / (1 + G*K)
//! b0   = G * (1 + K) * norm
//! b1   = G * (K - 1) * norm
//! a1   = (G*K - 1) * norm
//!
//! y[n] = b0*x[n] + b1*x[n-1] - a1*y[n-1]
//! ```
//!
//! `exp`, `pow10` and `tan` are replaced by cheap approximations so that
//! retuning from a parameter change costs a handful of multiplies.

use std::f32::consts::PI;

/// Lowest cutoff accepted, in Hz.
const MIN_CUTOFF_HZ: f32 = 10.0;

/// Gain range in dB over which the fast pow10 stays accurate.
const MAX_GAIN_DB: f32 = 24.0;

/// A first-order high shelf in direct form I.
#[derive(Debug, Clone)]
pub struct ShelvingFilter {
    b0: f32,
    b1: f32,
    a1: f32,

    /// Previous input.
    x1: f32,
    /// Previous output.
    y1: f32,
}

impl Default for ShelvingFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ShelvingFilter {
    /// Create a filter that passes audio through unchanged until
    /// [`set_parameters()`](Self::set_parameters) is called.
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            a1: 0.0,
            x1: 0.0,
            y1: 0.0,
        }
    }

    /// Recompute the coefficients for a shelf at `cutoff_hz` with
    /// `gain_db` of high-frequency gain.
    ///
    /// The cutoff is clamped to `[10 Hz, 0.49 * sample_rate]` and the gain
    /// to ±24 dB, where the approximations below are well behaved. At rates
    /// too low for that range, the upper bound wins.
    pub fn set_parameters(&mut self, cutoff_hz: f32, gain_db: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.max(MIN_CUTOFF_HZ).min(sample_rate * 0.49);
        let gain_db = gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB);

        let g = fast_pow10(gain_db / 20.0);
        let k = fast_tan(PI * cutoff / sample_rate);
        let norm = 1.0 / (1.0 + g * k);

        self.b0 = g * (1.0 + k) * norm;
        self.b1 = g * (k - 1.0) * norm;
        self.a1 = (g * k - 1.0) * norm;
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 - self.a1 * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

/// `exp(x)` as `(1 + x/256)^256`, eight squarings.
#[inline]
pub fn fast_exp(x: f32) -> f32 {
    let mut y = 1.0 + x / 256.0;
    for _ in 0..8 {
        y *= y;
    }
    y
}

/// `10^x` via [`fast_exp`].
#[inline]
pub fn fast_pow10(x: f32) -> f32 {
    fast_exp(x * std::f32::consts::LN_10)
}

/// Rational `tan(x)` approximation (Massberg), accurate on `[0, π/2)`.
#[inline]
pub fn fast_tan(x: f32) -> f32 {
    let x2 = x * x;
    x * (0.999_999_5 + x2 * -0.096_524_61) / (1.0 + x2 * (-0.429_867_25 + x2 * 0.009_981_878))
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
