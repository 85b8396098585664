//! # Stereoizer
//!
//! The engine is mono. To widen it, the mono output is sent through two
//! long allpasses, one per channel, with different lengths and different
//! LFOs. Both channels keep the same spectrum (allpasses are flat) but
//! their phase drifts apart, so the ear hears two uncorrelated signals.
//!
//! ```text
//!            ┌──► [AP left,  LFO a] ──► L
//! mono ──────┤
//!            └──► [AP right, LFO b] ──► R
//! ```

use crate::dsp::allpass::ModulatedAllpass;
use crate::dsp::lfo;

#[derive(Debug, Clone)]
pub struct Stereoizer {
    left: ModulatedAllpass,
    right: ModulatedAllpass,
}

impl Stereoizer {
    pub fn new(left: ModulatedAllpass, right: ModulatedAllpass) -> Self {
        Self { left, right }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.left.prepare(sample_rate);
        self.right.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Split one mono sample into a decorrelated `(left, right)` pair,
    /// reading modulation from the engine's LFO values.
    #[inline]
    pub fn process_sample(&mut self, mono: f32, lfo_values: &[f32]) -> (f32, f32) {
        let left_mod = lfo::lookup(lfo_values, self.left.lfo_index());
        let right_mod = lfo::lookup(lfo_values, self.right.lfo_index());
        (
            self.left.process_sample(mono, left_mod),
            self.right.process_sample(mono, right_mod),
        )
    }

    pub fn update_delay_times(&mut self, global_size: f32) {
        self.left.update_delay_time(global_size);
        self.right.update_delay_time(global_size);
    }

    pub fn update_coefficient_scaling(&mut self, global_density: f32) {
        self.left.update_coefficient_scaling(global_density);
        self.right.update_coefficient_scaling(global_density);
    }

    pub fn left(&self) -> &ModulatedAllpass {
        &self.left
    }

    pub fn right(&self) -> &ModulatedAllpass {
        &self.right
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::allpass::{AllpassSettings, DelayUnit, ModulationTarget};
    use crate::dsp::lfo::{Lfo, LfoBank};

    fn ap(base_delay: f32, lfo_index: usize) -> ModulatedAllpass {
        ModulatedAllpass::new(AllpassSettings {
            unit: DelayUnit::Samples,
            base_delay,
            coefficient: 0.5,
            depth: 1.0,
            modulation: ModulationTarget::DelayTime,
            lfo_index,
            scale_delay: true,
            scale_coefficient: true,
            modulation_headroom: 10.0,
        })
    }

    /// Same allpass length, different LFOs: once the oscillators have
    /// drifted apart, the channels stop matching.
    #[test]
    fn test_different_lfos_decorrelate_channels() {
        let mut lfos = LfoBank::new(vec![Lfo::new(3.0, 10.0), Lfo::new(5.0, 10.0)]);
        lfos.prepare(44100.0);

        let mut stereo = Stereoizer::new(ap(200.0, 0), ap(200.0, 1));
        stereo.prepare(44100.0);

        // A constant signal switched on at n = 0: every echo of that edge
        // lands at a slightly different time on each side.
        let mut differing = 0;
        for _ in 0..4410 {
            lfos.update();
            let (l, r) = stereo.process_sample(1.0, lfos.values());
            assert!(l.is_finite() && r.is_finite());
            if (l - r).abs() > 1e-4 {
                differing += 1;
            }
        }
        assert!(differing > 5, "only {differing} samples differed");
    }

    /// With the same LFO and the same length, both sides are identical.
    #[test]
    fn test_identical_channels_when_settings_match() {
        let mut stereo = Stereoizer::new(ap(50.0, 0), ap(50.0, 0));
        stereo.prepare(48000.0);

        for n in 0..500 {
            let lfo = (n as f32 * 0.01).sin();
            let (l, r) = stereo.process_sample(if n == 0 { 1.0 } else { 0.0 }, &[lfo]);
            assert_eq!(l, r);
        }
    }

    #[test]
    fn test_updates_forward_to_both_channels() {
        let mut stereo = Stereoizer::new(ap(2200.0, 0), ap(2000.0, 1));
        stereo.prepare(44100.0);

        stereo.update_delay_times(0.5);
        assert_eq!(stereo.left().effective_delay(), 1100.0);
        assert_eq!(stereo.right().effective_delay(), 1000.0);

        stereo.update_coefficient_scaling(0.6);
        assert!((stereo.left().effective_coefficient() - 0.3).abs() < 1e-6);
        assert!((stereo.right().effective_coefficient() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_reset_silences_both_channels() {
        let mut stereo = Stereoizer::new(ap(30.0, 0), ap(40.0, 0));
        stereo.prepare(44100.0);
        for _ in 0..100 {
            stereo.process_sample(1.0, &[0.0]);
        }

        stereo.reset();
        for _ in 0..100 {
            assert_eq!(stereo.process_sample(0.0, &[0.0]), (0.0, 0.0));
        }
    }
}
