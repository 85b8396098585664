//! # Stereo Reverb
//!
//! [`Reverb`] is the whole effect as the plugin sees it: the stereo input
//! is summed to mono, run through the [`MultistageReverb`] network, then
//! split back into two decorrelated channels by the [`Stereoizer`].
//!
//! ```text
//! L ──┐                                         ┌──► L
//!     ├─► ½(L + R) ──► [MultistageReverb] ──► [Stereoizer]
//! R ──┘                        │                ▲   └──► R
//!                              └── LFO values ──┘
//! ```
//!
//! The stereoizer owns no oscillators. It reads the engine's LFO values
//! from the same tick, so both share one modulation source.
//!
//! Global parameters are applied through [`ReverbSettings`]: only fields
//! that actually changed are forwarded, which keeps shelf recalculation
//! and routing rebuilds out of blocks where nothing moved.

use crate::config::ReverbConfig;
use crate::dsp::engine::MultistageReverb;
use crate::dsp::stereoizer::Stereoizer;
use crate::error::ConfigError;

/// The global, user-facing controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    /// Delay scale factor for size-scaled allpasses, 0.0 to 2.0.
    pub size: f32,
    /// Multiplier for feedback-flagged routing edges.
    pub feedback: f32,
    /// Coefficient scale factor for density-scaled allpasses.
    pub density: f32,
    pub shelf_cutoff_hz: f32,
    pub shelf_gain_db: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            size: 1.0,
            feedback: 0.7,
            density: 0.6,
            shelf_cutoff_hz: 8000.0,
            shelf_gain_db: -6.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reverb {
    engine: MultistageReverb,
    stereoizer: Stereoizer,
    settings: ReverbSettings,
    sample_rate: f32,
}

impl Reverb {
    /// Build the engine and stereoizer from `config` and apply the default
    /// [`ReverbSettings`].
    pub fn new(config: &ReverbConfig) -> Result<Self, ConfigError> {
        let engine = MultistageReverb::new(config)?;

        let lfos = config.build_lfos();
        let stereoizer = Stereoizer::new(
            config.stereoizer.left.build(config.delay_unit, &lfos),
            config.stereoizer.right.build(config.delay_unit, &lfos),
        );

        let mut reverb = Self {
            engine,
            stereoizer,
            settings: ReverbSettings::default(),
            sample_rate: 44100.0,
        };
        reverb.force_settings(reverb.settings);
        Ok(reverb)
    }

    /// Allocate buffers for `sample_rate` and clear all state. Current
    /// settings are kept.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.engine.prepare(sample_rate);
        self.stereoizer.prepare(sample_rate);
        // prepare() recomputes delays in the new unit; the shelf needs the
        // new rate as well.
        self.force_settings(self.settings);
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.stereoizer.reset();
    }

    /// One mono sample in, one stereo pair out.
    #[inline]
    pub fn process_sample(&mut self, mono: f32) -> (f32, f32) {
        let wet = self.engine.process_sample(mono);
        self.stereoizer.process_sample(wet, self.engine.lfo_values())
    }

    /// Process two channel buffers in place. The input is averaged to mono
    /// first. Only the shorter length is processed if they differ.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        nih_plug::nih_debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (out_l, out_r) = self.process_sample(0.5 * (*l + *r));
            *l = out_l;
            *r = out_r;
        }
    }

    /// Forward whichever settings differ from the current ones.
    pub fn apply_settings(&mut self, settings: ReverbSettings) {
        let current = self.settings;
        if settings.size != current.size {
            self.set_size(settings.size);
        }
        if settings.feedback != current.feedback {
            self.set_feedback(settings.feedback);
        }
        if settings.density != current.density {
            self.set_density(settings.density);
        }
        if settings.shelf_cutoff_hz != current.shelf_cutoff_hz
            || settings.shelf_gain_db != current.shelf_gain_db
        {
            self.set_shelf(settings.shelf_cutoff_hz, settings.shelf_gain_db);
        }
    }

    fn force_settings(&mut self, settings: ReverbSettings) {
        self.set_size(settings.size);
        self.set_feedback(settings.feedback);
        self.set_density(settings.density);
        self.set_shelf(settings.shelf_cutoff_hz, settings.shelf_gain_db);
    }

    pub fn set_size(&mut self, size: f32) {
        self.settings.size = size;
        self.engine.update_global_size_parameter(size);
        self.stereoizer.update_delay_times(size);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.settings.feedback = feedback;
        self.engine.update_feedback_parameter(feedback);
    }

    pub fn set_density(&mut self, density: f32) {
        self.settings.density = density;
        self.engine.update_global_density_parameter(density);
        self.stereoizer.update_coefficient_scaling(density);
    }

    pub fn set_shelf(&mut self, cutoff_hz: f32, gain_db: f32) {
        self.settings.shelf_cutoff_hz = cutoff_hz;
        self.settings.shelf_gain_db = gain_db;
        self.engine.update_global_shelf_parameters(cutoff_hz, gain_db);
    }

    pub fn settings(&self) -> ReverbSettings {
        self.settings
    }

    pub fn engine(&self) -> &MultistageReverb {
        &self.engine
    }

    pub fn stereoizer(&self) -> &Stereoizer {
        &self.stereoizer
    }

    /// Tail length to report to the host: the engine's decay estimate plus
    /// the longer stereoizer allpass. Capped at ten seconds when a loop
    /// does not decay.
    pub fn tail_samples(&self) -> u32 {
        let cap = 10.0 * self.sample_rate;
        let stereo = self
            .stereoizer
            .left()
            .effective_delay()
            .max(self.stereoizer.right().effective_delay());

        match self.engine.estimated_tail_samples() {
            Some(tail) => (tail + stereo).min(cap) as u32,
            None => cap as u32,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
