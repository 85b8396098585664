//! # Modulated Allpass Delay Line
//!
//! The building block of the whole reverb. An allpass filter lets every
//! frequency through at the same level but smears it in time: an impulse
//! goes in, a decaying train of echoes comes out. Chains of them turn a
//! click into a diffuse wash.
//!
//! ## The Difference Equation
//!
//! With a delay of `D` samples and coefficient `g`:
//!
//! ```text
//! v[n] = x[n] - g * v[n - D]
//! y[n] = g * v[n] + v[n - D]
//! ```
//!
//! Only `v` is stored in the ring buffer. The filter is stable while
//! `|g| < 1`, so every path that changes the coefficient clamps it to
//! [`MAX_COEFFICIENT`].
//!
//! ## Power-of-Two Ring Buffer
//!
//! The buffer length is always a power of two, so wrapping an index is a
//! bitwise AND with `len - 1` instead of a `%`. Because the mask keeps
//! every index inside the buffer, no read can ever go out of bounds, no
//! matter what delay is requested.
//!
//! The buffer is sized once in [`prepare()`](ModulatedAllpass::prepare)
//! for the worst case the allpass can ever reach:
//!
//! ```text
//! base delay × MAX_SIZE_SCALE + modulation headroom + INTERPOLATION_MARGIN
//! ```
//!
//! ...so turning the "size" knob never reallocates on the audio thread.
//!
//! ## Fractional Delay
//!
//! Modulated delays are rarely whole numbers. For a delay of 80.4 samples
//! we read the taps 80 and 81 samples back and blend them:
//!
//! ```text
//! delayed = tap(80) * 0.6 + tap(81) * 0.4
//! ```

use serde::{Deserialize, Serialize};

/// Largest magnitude an effective coefficient may take.
pub const MAX_COEFFICIENT: f32 = 0.99;

/// Largest global size factor. Buffers are allocated for this up front.
pub const MAX_SIZE_SCALE: f32 = 2.0;

/// Extra samples beyond the longest delay, covering the second
/// interpolation tap and rounding.
pub const INTERPOLATION_MARGIN: usize = 4;

/// Shortest delay the allpass will read. Reading happens before writing,
/// so one sample back is the most recent value in the buffer.
pub const MIN_DELAY: f32 = 1.0;

/// Longest worst-case delay, in samples, a buffer is ever sized for.
/// 2^22 samples is about 95 s at 44.1 kHz and 11 s at 384 kHz.
pub const MAX_DELAY_SAMPLES: f32 = 4_194_304.0;

/// Highest sample rate millisecond delays are checked against when a
/// topology is validated.
pub const MAX_SAMPLE_RATE: f32 = 384_000.0;

/// Which parameter the LFO value perturbs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationTarget {
    /// `delay = base + depth * lfo`. Chorus-like pitch wobble.
    #[default]
    DelayTime,
    /// `g = coefficient + depth * lfo`. The delay stays fixed and the
    /// density of the echo train breathes instead.
    Coefficient,
}

/// Unit of every delay, depth and LFO amplitude in a topology description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    /// Raw samples. Delay lengths stay the same at every sample rate.
    #[default]
    Samples,
    /// Milliseconds, converted with `ms * sample_rate / 1000`.
    Milliseconds,
}

impl DelayUnit {
    pub fn samples_per_unit(self, sample_rate: f32) -> f32 {
        match self {
            Self::Samples => 1.0,
            Self::Milliseconds => sample_rate / 1000.0,
        }
    }
}

/// Construction-time description of one allpass.
///
/// `base_delay`, `depth` and `modulation_headroom` are all in `unit`; they
/// are converted to samples in [`ModulatedAllpass::prepare()`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllpassSettings {
    pub unit: DelayUnit,
    pub base_delay: f32,
    pub coefficient: f32,
    pub depth: f32,
    pub modulation: ModulationTarget,
    pub lfo_index: usize,
    pub scale_delay: bool,
    pub scale_coefficient: bool,

    /// Largest `|depth * lfo|` this allpass can see. Only reserves buffer
    /// space in [`ModulationTarget::DelayTime`] mode.
    pub modulation_headroom: f32,
}

impl AllpassSettings {
    /// The longest delay, in samples, this allpass can reach at
    /// `sample_rate`: the base delay at the largest size factor plus the
    /// modulation headroom. Coefficient modulation needs no headroom.
    pub fn worst_case_delay(&self, sample_rate: f32) -> f32 {
        let headroom = match self.modulation {
            ModulationTarget::DelayTime => self.modulation_headroom.abs(),
            ModulationTarget::Coefficient => 0.0,
        };
        (self.base_delay.max(0.0) * MAX_SIZE_SCALE + headroom)
            * self.unit.samples_per_unit(sample_rate)
    }
}

/// One modulated fractional-delay allpass stage with its own ring buffer.
#[derive(Debug, Clone)]
pub struct ModulatedAllpass {
    settings: AllpassSettings,

    /// Conversion from `settings.unit` to samples at the prepared rate.
    samples_per_unit: f32,

    /// Last global size factor applied (1.0 for non-participants).
    size_scale: f32,

    /// Base delay after size scaling, in samples.
    effective_delay: f32,

    /// Coefficient after density scaling, always within ±MAX_COEFFICIENT.
    effective_coefficient: f32,

    /// Longest delay the buffer can serve.
    max_delay: f32,

    /// Stores `v[n]`. Length is a power of two (or zero before prepare()).
    buffer: Vec<f32>,

    /// `buffer.len() - 1`.
    mask: usize,

    /// Slot that the next `v[n]` is written to.
    write_pos: usize,
}

impl ModulatedAllpass {
    pub fn new(settings: AllpassSettings) -> Self {
        Self {
            samples_per_unit: 1.0,
            size_scale: 1.0,
            effective_delay: settings.base_delay,
            effective_coefficient: clamp_coefficient(settings.coefficient),
            max_delay: 0.0,
            buffer: Vec::new(),
            mask: 0,
            write_pos: 0,
            settings,
        }
    }

    /// Convert delays to samples at `sample_rate`, then allocate and zero
    /// the ring buffer for the worst-case delay.
    ///
    /// The size depends on the *configured* base delay at the largest size
    /// factor, not on the current effective delay, so the buffer never has
    /// to grow later.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.samples_per_unit = self.settings.unit.samples_per_unit(sample_rate);
        self.effective_delay = self.settings.base_delay * self.size_scale * self.samples_per_unit;

        let mut worst_case = self.settings.worst_case_delay(sample_rate);
        if worst_case.is_nan() || worst_case > MAX_DELAY_SAMPLES {
            nih_plug::nih_warn!(
                "Allpass needs {} samples of delay at {} Hz; limiting the buffer to {}",
                worst_case,
                sample_rate,
                MAX_DELAY_SAMPLES
            );
            worst_case = MAX_DELAY_SAMPLES;
        }
        // Bounded by MAX_DELAY_SAMPLES, so neither step can overflow.
        let required = worst_case.ceil() as usize + INTERPOLATION_MARGIN;
        let len = required.next_power_of_two();

        self.buffer = vec![0.0; len];
        self.mask = len - 1;
        self.write_pos = 0;

        // Two taps are read: int and int + 1 samples back.
        self.max_delay = (len - 2) as f32;
    }

    /// Clear the buffer to silence without resizing it.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Rescale the base delay by the global size factor, if this allpass
    /// participates. The factor is clamped to what the buffer was sized for.
    pub fn update_delay_time(&mut self, global_size: f32) {
        if self.settings.scale_delay {
            self.size_scale = global_size.clamp(0.0, MAX_SIZE_SCALE);
            self.effective_delay =
                self.settings.base_delay * self.size_scale * self.samples_per_unit;
        }
    }

    /// Rescale the coefficient by the global density factor, if this
    /// allpass participates.
    pub fn update_coefficient_scaling(&mut self, global_density: f32) {
        if self.settings.scale_coefficient {
            self.effective_coefficient =
                clamp_coefficient(self.settings.coefficient * global_density);
        }
    }

    /// Run one sample through the allpass.
    ///
    /// `lfo_value` is this tick's output of the oscillator at
    /// [`lfo_index()`](Self::lfo_index).
    #[inline]
    pub fn process_sample(&mut self, input: f32, lfo_value: f32) -> f32 {
        nih_plug::nih_debug_assert!(!self.buffer.is_empty(), "allpass used before prepare()");
        if self.buffer.is_empty() {
            return input;
        }

        // Step 1: work out this tick's delay and coefficient.
        let modulation = self.settings.depth * lfo_value;
        let (target_delay, coefficient) = match self.settings.modulation {
            ModulationTarget::DelayTime => (
                self.effective_delay + modulation * self.samples_per_unit,
                self.effective_coefficient,
            ),
            ModulationTarget::Coefficient => (
                self.effective_delay,
                clamp_coefficient(self.effective_coefficient + modulation),
            ),
        };

        // Step 2: keep the delay inside what the buffer can serve.
        let delay = target_delay.clamp(MIN_DELAY, self.max_delay);

        // Step 3: read two neighbouring taps and interpolate.
        let delay_int = delay as usize;
        let delay_frac = delay - delay_int as f32;
        let index_a = self.write_pos.wrapping_sub(delay_int) & self.mask;
        let index_b = self.write_pos.wrapping_sub(delay_int + 1) & self.mask;
        let delayed = self.buffer[index_a] * (1.0 - delay_frac) + self.buffer[index_b] * delay_frac;

        // Step 4: allpass difference equation.
        let v = input - coefficient * delayed;
        let output = coefficient * v + delayed;

        // Step 5: store v and move the write head.
        self.buffer[self.write_pos] = v;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    pub fn lfo_index(&self) -> usize {
        self.settings.lfo_index
    }

    /// Current base delay in samples, after size scaling.
    pub fn effective_delay(&self) -> f32 {
        self.effective_delay
    }

    /// Current coefficient, after density scaling.
    pub fn effective_coefficient(&self) -> f32 {
        self.effective_coefficient
    }

    /// Allocated ring buffer length in samples.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay the allocated buffer can serve.
    pub fn max_delay(&self) -> f32 {
        self.max_delay
    }
}

#[inline]
fn clamp_coefficient(coefficient: f32) -> f32 {
    coefficient.clamp(-MAX_COEFFICIENT, MAX_COEFFICIENT)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
