//! # Reverb Stage
//!
//! A stage is one diffusion/decay unit in the routing graph: an optional
//! shelving filter followed by a fixed chain of modulated allpasses.
//!
//! ```text
//! in ──► [Shelf?] ──► [AP 0] ──► [AP 1] ──► ... ──► [AP n-1] ──► out
//!                       ▲          ▲                   ▲
//!                       └──────────┴─── lfo_values[i] ─┘
//! ```
//!
//! Stages own no oscillators. Each allpass carries an index into the
//! engine's LFO values, which the engine passes in on every call.

use crate::dsp::allpass::ModulatedAllpass;
use crate::dsp::lfo;
use crate::dsp::shelf::ShelvingFilter;

/// Tone-filter settings for a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShelfSettings {
    pub cutoff_hz: f32,
    pub gain_db: f32,

    /// Whether the global shelf parameters retune this filter.
    pub attached: bool,
}

#[derive(Debug, Clone)]
struct StageShelf {
    filter: ShelvingFilter,
    settings: ShelfSettings,
}

/// An ordered allpass chain, optionally preceded by a high shelf.
#[derive(Debug, Clone)]
pub struct Stage {
    allpasses: Vec<ModulatedAllpass>,
    shelf: Option<StageShelf>,
    sample_rate: f32,
}

impl Stage {
    pub fn new(allpasses: Vec<ModulatedAllpass>, shelf: Option<ShelfSettings>) -> Self {
        Self {
            allpasses,
            shelf: shelf.map(|settings| StageShelf {
                filter: ShelvingFilter::new(),
                settings,
            }),
            sample_rate: 44100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        if let Some(shelf) = &mut self.shelf {
            let ShelfSettings {
                cutoff_hz, gain_db, ..
            } = shelf.settings;
            shelf.filter.set_parameters(cutoff_hz, gain_db, sample_rate);
            shelf.filter.reset();
        }
        for ap in &mut self.allpasses {
            ap.prepare(sample_rate);
        }
    }

    pub fn reset(&mut self) {
        if let Some(shelf) = &mut self.shelf {
            shelf.filter.reset();
        }
        for ap in &mut self.allpasses {
            ap.reset();
        }
    }

    /// Run one routed input sample through the shelf and the allpass chain.
    #[inline]
    pub fn process_sample(&mut self, input: f32, lfo_values: &[f32]) -> f32 {
        let mut signal = match &mut self.shelf {
            Some(shelf) => shelf.filter.process_sample(input),
            None => input,
        };

        for ap in &mut self.allpasses {
            let modulation = lfo::lookup(lfo_values, ap.lfo_index());
            signal = ap.process_sample(signal, modulation);
        }

        signal
    }

    pub fn update_delay_times(&mut self, global_size: f32) {
        for ap in &mut self.allpasses {
            ap.update_delay_time(global_size);
        }
    }

    pub fn update_coefficient_scaling(&mut self, global_density: f32) {
        for ap in &mut self.allpasses {
            ap.update_coefficient_scaling(global_density);
        }
    }

    /// Retune the shelf, but only if this stage has one attached to the
    /// global tone controls. Fixed shelves keep their configured values.
    pub fn update_shelf(&mut self, cutoff_hz: f32, gain_db: f32) {
        if let Some(shelf) = &mut self.shelf {
            if shelf.settings.attached {
                shelf.settings.cutoff_hz = cutoff_hz;
                shelf.settings.gain_db = gain_db;
                shelf.filter.set_parameters(cutoff_hz, gain_db, self.sample_rate);
            }
        }
    }

    pub fn allpasses(&self) -> &[ModulatedAllpass] {
        &self.allpasses
    }

    pub fn has_shelf(&self) -> bool {
        self.shelf.is_some()
    }

    /// Current shelf settings, if the stage has a shelf.
    pub fn shelf_settings(&self) -> Option<ShelfSettings> {
        self.shelf.as_ref().map(|shelf| shelf.settings)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
