//! # Griffin Reverb: A Multi-Stage Allpass Reverb Plugin
//!
//! An algorithmic reverb built from modulated allpass delay lines, packaged
//! as AUv2/VST3/CLAP with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! The DSP lives in [`dsp`] and does not depend on the plugin layer, so it
//! can be driven directly through [`Reverb`] or [`MultistageReverb`].
//!
//! ## Signal Flow
//!
//! ```text
//!                ┌────────────────── MultistageReverb ──────────────────┐
//! L ──┐          │                     ┌─ × feedback ─┐                 │
//!     ├─► mono ──┼─► [Stage 0] ──► [Shelf ► Stage 1] ─┴─► [Stage 2] ──► out ──┐
//! R ──┘          │   early            tank              late            │     │
//!                └─────────────────────────────────────────────────────┘     │
//!                                                                            ▼
//!                                                  L ◄── [Stereoizer] ──► R
//! ```
//!
//! Every stage is a chain of allpasses modulated by a shared LFO bank. The
//! topology (stages, delays, routing weights) is data: see
//! [`ReverbConfig`]. The host only sees the five global controls in
//! [`params`].

pub mod config;
pub mod dsp;
pub mod error;
pub mod params;
pub mod reverb;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

pub use config::ReverbConfig;
pub use dsp::engine::MultistageReverb;
pub use error::ConfigError;
pub use params::ReverbParams;
pub use reverb::{Reverb, ReverbSettings};

/// The plugin. All DSP state lives in `reverb`, built in `initialize()`
/// once the sample rate is known.
pub struct GriffinReverb {
    params: Arc<ReverbParams>,
    config: ReverbConfig,
    reverb: Option<Reverb>,
}

impl Default for GriffinReverb {
    fn default() -> Self {
        Self {
            params: Arc::new(ReverbParams::default()),
            config: ReverbConfig::default(),
            reverb: None,
        }
    }
}

impl Plugin for GriffinReverb {
    const NAME: &'static str = "Griffin Reverb";
    const VENDOR: &'static str = "Griffin Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // On a mono track the two stereoizer outputs are folded back together.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are applied once per block.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Build and prepare the reverb for the host's sample rate. Returns
    /// `false` if the rate is unusable or the topology is invalid.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let sample_rate = buffer_config.sample_rate;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            nih_error!("Refusing to initialize at a sample rate of {sample_rate} Hz");
            return false;
        }

        let mut reverb = match Reverb::new(&self.config) {
            Ok(reverb) => reverb,
            Err(err) => {
                nih_error!("Invalid reverb topology: {err}");
                return false;
            }
        };
        reverb.apply_settings(self.params.settings());
        reverb.prepare(sample_rate);

        self.reverb = Some(reverb);
        true
    }

    fn reset(&mut self) {
        if let Some(reverb) = &mut self.reverb {
            reverb.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let Some(reverb) = &mut self.reverb else {
            return ProcessStatus::Normal;
        };

        reverb.apply_settings(self.params.settings());

        for mut channel_samples in buffer.iter_samples() {
            let num_channels = channel_samples.len();
            if num_channels == 0 {
                continue;
            }
            let mono = channel_samples.iter_mut().map(|s| *s).sum::<f32>() / num_channels as f32;

            let (left, right) = reverb.process_sample(mono);

            if num_channels == 1 {
                if let Some(sample) = channel_samples.get_mut(0) {
                    *sample = 0.5 * (left + right);
                }
                continue;
            }
            if let Some(sample) = channel_samples.get_mut(0) {
                *sample = left;
            }
            if let Some(sample) = channel_samples.get_mut(1) {
                *sample = right;
            }
        }

        ProcessStatus::Tail(reverb.tail_samples())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for GriffinReverb {
    const CLAP_ID: &'static str = "com.griffin-audio.griffin-reverb";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A multi-stage modulated allpass reverb");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Reverb,
    ];
}

impl Vst3Plugin for GriffinReverb {
    const VST3_CLASS_ID: [u8; 16] = *b"GriffinReverb001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Reverb];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────

nih_export_clap!(GriffinReverb);
nih_export_vst3!(GriffinReverb);

// AUv2 entry point for Logic Pro, wrapping the CLAP plugin.
clap_wrapper::export_auv2!();
