//! # Low-Frequency Oscillators
//!
//! Every allpass in the reverb wobbles its delay time (or its feedback
//! coefficient) a little, driven by a slow oscillator. Without this, the
//! fixed delay lengths produce metallic ringing; with it, the tail smears
//! into a smooth, chorused wash.
//!
//! ## One Bank, Many Readers
//!
//! Oscillators are not owned by the allpasses that use them. The engine
//! owns a single [`LfoBank`], advances it exactly once per sample, and
//! every allpass reads this tick's value by *index*. Two allpasses that
//! share index 1 see exactly the same modulation value at the same tick.
//!
//! ## The Parabolic Sine
//!
//! We don't call `sin()`. The phase `p ∈ [0, 1)` is shaped with a
//! parabola that lands on the same zero crossings and peaks as a sine:
//!
//! ```text
//! s = 0.5 - p
//! y = s * (8 - 16 * |s|)
//! ```
//!
//! At `p = 0.25`, `s = 0.25` and `y = 0.25 * (8 - 4) = 1.0`. At `p = 0.75`,
//! `y = -1.0`. At `p = 0`, `0.5`, `y = 0`. The slightly "rounded triangle"
//! shape is part of the modulation character.

/// A phase-accumulating oscillator returning `amplitude * parabolic_sine(phase)`.
#[derive(Debug, Clone)]
pub struct Lfo {
    frequency_hz: f32,
    amplitude: f32,

    /// Normalized phase, always in `[0, 1)`.
    phase: f32,

    sample_rate: f32,

    /// Phase step per sample: `frequency / sample_rate`.
    increment: f32,
}

impl Lfo {
    pub fn new(frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            frequency_hz,
            amplitude,
            phase: 0.0,
            sample_rate: 44100.0,
            increment: 0.0,
        }
    }

    /// Compute the phase increment for `sample_rate` and restart at phase 0.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.increment = self.frequency_hz / sample_rate;

        // The wrap in update() is a single subtraction, which only holds
        // while the phase moves less than one cycle per sample.
        if self.increment >= 1.0 {
            nih_plug::nih_warn!(
                "LFO at {} Hz is not below the {} Hz sample rate; phase will not wrap correctly",
                self.frequency_hz,
                sample_rate
            );
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance by one sample and return the new modulation value.
    ///
    /// Not idempotent: each call moves the phase forward.
    #[inline]
    pub fn update(&mut self) -> f32 {
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.amplitude * parabolic_sine(self.phase)
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz;
        self.increment = frequency_hz / self.sample_rate;
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

/// Fast sine approximation over one normalized cycle.
#[inline]
fn parabolic_sine(phase: f32) -> f32 {
    let shifted = 0.5 - phase;
    shifted * (8.0 - 16.0 * shifted.abs())
}

/// This tick's value for the LFO at `index`.
///
/// Indices are checked when the topology is validated, so a miss here is a
/// bug: debug builds report it, release builds fall back to no modulation.
#[inline]
pub fn lookup(values: &[f32], index: usize) -> f32 {
    nih_plug::nih_debug_assert!(
        index < values.len(),
        "LFO index {} out of range ({} LFOs)",
        index,
        values.len()
    );
    value_or_neutral(values, index)
}

/// `values[index]`, or 0.0 (no modulation) past the end.
#[inline]
fn value_or_neutral(values: &[f32], index: usize) -> f32 {
    values.get(index).copied().unwrap_or(0.0)
}

/// The engine-wide set of oscillators plus this tick's output values.
///
/// `values()` is written once per tick by [`update()`](Self::update) and
/// then read by every stage and by the stereoizer.
#[derive(Debug, Clone, Default)]
pub struct LfoBank {
    lfos: Vec<Lfo>,
    values: Vec<f32>,
}

impl LfoBank {
    pub fn new(lfos: Vec<Lfo>) -> Self {
        let values = vec![0.0; lfos.len()];
        Self { lfos, values }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        for lfo in &mut self.lfos {
            lfo.prepare(sample_rate);
        }
        self.values.fill(0.0);
    }

    pub fn reset(&mut self) {
        for lfo in &mut self.lfos {
            lfo.reset();
        }
        self.values.fill(0.0);
    }

    /// Advance every oscillator once and publish the results.
    #[inline]
    pub fn update(&mut self) {
        for (value, lfo) in self.values.iter_mut().zip(self.lfos.iter_mut()) {
            *value = lfo.update();
        }
    }

    /// The values produced by the most recent [`update()`](Self::update).
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.lfos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lfos.is_empty()
    }

    /// Largest absolute amplitude of the oscillator at `index`, or 0 if
    /// there is none. Used to size allpass buffers for modulation headroom.
    pub fn peak(&self, index: usize) -> f32 {
        self.lfos.get(index).map_or(0.0, |lfo| lfo.amplitude().abs())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The parabola hits the same landmarks as a unit sine.
    #[test]
    fn test_parabolic_sine_landmarks() {
        assert!(parabolic_sine(0.0).abs() < 1e-6);
        assert!((parabolic_sine(0.25) - 1.0).abs() < 1e-6);
        assert!(parabolic_sine(0.5).abs() < 1e-6);
        assert!((parabolic_sine(0.75) + 1.0).abs() < 1e-6);
    }

    /// The approximation stays within a few percent of a real sine.
    #[test]
    fn test_parabolic_sine_tracks_sine() {
        for i in 0..100 {
            let phase = i as f32 / 100.0;
            let exact = (2.0 * std::f32::consts::PI * phase).sin();
            let approx = parabolic_sine(phase);
            assert!(
                (exact - approx).abs() < 0.07,
                "phase {phase}: sin = {exact}, approx = {approx}"
            );
        }
    }

    /// Phase never leaves [0, 1), however long the oscillator runs.
    #[test]
    fn test_phase_stays_in_unit_interval() {
        let mut lfo = Lfo::new(7.3, 1.0);
        lfo.prepare(48000.0);
        for _ in 0..200_000 {
            lfo.update();
            let phase = lfo.phase();
            assert!((0.0..1.0).contains(&phase), "phase escaped: {phase}");
        }
    }

    /// Output is scaled by the amplitude and peaks near it.
    #[test]
    fn test_amplitude_scales_output() {
        let mut lfo = Lfo::new(1.0, 11.0);
        lfo.prepare(1000.0);

        let peak = (0..1000).map(|_| lfo.update().abs()).fold(0.0_f32, f32::max);
        assert!((peak - 11.0).abs() < 0.01, "expected peak ~11, got {peak}");
    }

    /// A quarter of a cycle in, a 1 Hz LFO at 1 kHz is at its maximum.
    #[test]
    fn test_prepare_sets_increment() {
        let mut lfo = Lfo::new(1.0, 1.0);
        lfo.prepare(1000.0);

        let mut last = 0.0;
        for _ in 0..250 {
            last = lfo.update();
        }
        assert!((last - 1.0).abs() < 1e-3, "expected ~1.0, got {last}");
    }

    /// reset() restarts the waveform so the same sequence comes out again.
    #[test]
    fn test_reset_restarts_sequence() {
        let mut lfo = Lfo::new(2.5, 3.0);
        lfo.prepare(44100.0);
        let first: Vec<f32> = (0..500).map(|_| lfo.update()).collect();

        lfo.reset();
        let second: Vec<f32> = (0..500).map(|_| lfo.update()).collect();
        assert_eq!(first, second);
    }

    /// Retuning mid-stream keeps the phase and changes the speed.
    #[test]
    fn test_set_frequency_recomputes_increment() {
        let mut lfo = Lfo::new(1.0, 1.0);
        lfo.prepare(1000.0);
        lfo.update();
        let before = lfo.phase();

        lfo.set_frequency(10.0);
        lfo.update();
        assert!((lfo.phase() - before - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_bank_publishes_one_value_per_lfo() {
        let mut bank = LfoBank::new(vec![Lfo::new(1.0, 1.0), Lfo::new(3.0, 2.0)]);
        bank.prepare(1000.0);
        assert_eq!(bank.values(), &[0.0, 0.0]);

        bank.update();
        let values = bank.values();
        assert_eq!(values.len(), 2);
        assert!(values[0] != 0.0 && values[1] != 0.0);
        assert!(values[0] != values[1]);

        bank.reset();
        assert_eq!(bank.values(), &[0.0, 0.0]);
    }

    #[test]
    fn test_bank_peak_ignores_missing_index() {
        let bank = LfoBank::new(vec![Lfo::new(1.0, -9.0)]);
        assert_eq!(bank.peak(0), 9.0);
        assert_eq!(bank.peak(5), 0.0);
    }

    #[test]
    fn test_lookup_reads_by_index() {
        let values = [0.25, -0.5, 1.0];
        assert_eq!(lookup(&values, 0), 0.25);
        assert_eq!(lookup(&values, 2), 1.0);
    }

    /// Past the end of the bank there is no modulation at all.
    #[test]
    fn test_missing_lfo_is_neutral() {
        assert_eq!(value_or_neutral(&[0.5], 3), 0.0);
        assert_eq!(value_or_neutral(&[], 0), 0.0);
        assert_eq!(value_or_neutral(&[0.5], 0), 0.5);
    }

    /// Debug builds stop on a bad index instead of hiding it.
    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn test_lookup_out_of_range_fails_loudly_in_debug() {
        lookup(&[0.5], 3);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_lookup_out_of_range_is_neutral_in_release() {
        assert_eq!(lookup(&[0.5], 3), 0.0);
    }
}
