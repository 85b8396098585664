//! # Multi-Stage Routing Engine
//!
//! The engine ties everything together: one shared LFO bank, one [`Stage`]
//! per configured stage, and a [`RoutingTable`] deciding how much of each
//! node reaches every other node.
//!
//! ## One Tick
//!
//! ```text
//! 1. advance every LFO once
//! 2. next = previous; next[input] = x
//! 3. for each stage j:  next[j] = stage_j( Σ previous[i] · w(i → j) )
//! 4. next[output] = Σ next[i] · w(i → output)
//! 5. previous = next; return next[output]
//! ```
//!
//! ## Why Stage Inputs Read the *Previous* Tick
//!
//! Stages never see values produced earlier in the same tick. Every edge
//! into a stage therefore carries exactly one sample of delay, so a
//! self-loop (`w(j → j)`) or a cycle between stages is a well-defined
//! recursion instead of an ordering problem. The order stages are visited
//! in doesn't matter.
//!
//! The output node has no state of its own and simply sums the freshly
//! computed values, so a stage's output reaches the output on the same
//! tick.
//!
//! ## Stability
//!
//! Nothing here guards against runaway feedback. The allpasses are
//! lossless, so a loop decays only if its routing weights multiply to less
//! than one. Keeping them there is the configuration's job.

use crate::config::ReverbConfig;
use crate::dsp::lfo::LfoBank;
use crate::dsp::routing::RoutingTable;
use crate::dsp::stage::Stage;
use crate::error::ConfigError;

/// The mono reverb network.
#[derive(Debug, Clone)]
pub struct MultistageReverb {
    lfos: LfoBank,
    stages: Vec<Stage>,
    routing: RoutingTable,

    /// Node values committed at the end of the previous tick.
    nodes: Vec<f32>,

    /// Scratch for the tick being computed. Swapped with `nodes` at the end.
    next: Vec<f32>,
}

impl MultistageReverb {
    /// Validate `config` and build the network. Buffers are not allocated
    /// until [`prepare()`](Self::prepare).
    pub fn new(config: &ReverbConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let lfos = config.build_lfos();
        let stages = config
            .stages
            .iter()
            .map(|stage| {
                let allpasses = stage
                    .allpasses
                    .iter()
                    .map(|ap| ap.build(config.delay_unit, &lfos))
                    .collect();
                Stage::new(allpasses, stage.shelf.map(Into::into))
            })
            .collect();
        let num_nodes = config.num_nodes();
        let routing = config.routing.build(num_nodes)?;

        Ok(Self {
            lfos,
            stages,
            routing,
            nodes: vec![0.0; num_nodes],
            next: vec![0.0; num_nodes],
        })
    }

    /// Size every buffer for `sample_rate` and clear all state. Must be
    /// called before the first [`process_sample()`](Self::process_sample).
    pub fn prepare(&mut self, sample_rate: f32) {
        self.lfos.prepare(sample_rate);
        for stage in &mut self.stages {
            stage.prepare(sample_rate);
        }
        self.nodes.fill(0.0);
        self.next.fill(0.0);

        let buffer_samples: usize = self
            .stages
            .iter()
            .flat_map(|stage| stage.allpasses())
            .map(|ap| ap.buffer_len())
            .sum();
        nih_plug::nih_log!(
            "Prepared {} stages / {} LFOs at {} Hz ({} delay samples)",
            self.stages.len(),
            self.lfos.len(),
            sample_rate,
            buffer_samples
        );
    }

    /// Zero all audio state (delay lines, filters, LFO phases, node
    /// values) without touching buffer sizes or parameters.
    pub fn reset(&mut self) {
        self.lfos.reset();
        for stage in &mut self.stages {
            stage.reset();
        }
        self.nodes.fill(0.0);
        self.next.fill(0.0);
    }

    /// Advance the whole network by one sample.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.lfos.update();
        let lfo_values = self.lfos.values();

        self.next.copy_from_slice(&self.nodes);
        self.next[0] = input;

        for (index, stage) in self.stages.iter_mut().enumerate() {
            let node = index + 1;
            let routed = self.routing.gather(&self.nodes, node);
            self.next[node] = stage.process_sample(routed, lfo_values);
        }

        let output_node = self.nodes.len() - 1;
        let output = self.routing.gather(&self.next, output_node);
        self.next[output_node] = output;

        std::mem::swap(&mut self.nodes, &mut self.next);
        output
    }

    /// Rescale the delays of every size-scaled allpass.
    pub fn update_global_size_parameter(&mut self, size: f32) {
        for stage in &mut self.stages {
            stage.update_delay_times(size);
        }
    }

    /// Scale every feedback-flagged connection by `feedback`.
    pub fn update_feedback_parameter(&mut self, feedback: f32) {
        self.routing.apply_feedback(feedback);
    }

    /// Rescale the coefficients of every density-scaled allpass.
    pub fn update_global_density_parameter(&mut self, density: f32) {
        for stage in &mut self.stages {
            stage.update_coefficient_scaling(density);
        }
    }

    /// Retune every shelf attached to the global tone controls.
    pub fn update_global_shelf_parameters(&mut self, cutoff_hz: f32, gain_db: f32) {
        for stage in &mut self.stages {
            stage.update_shelf(cutoff_hz, gain_db);
        }
    }

    /// LFO outputs of the most recent tick, for processors that share the
    /// engine's modulation (the stereoizer).
    #[inline]
    pub fn lfo_values(&self) -> &[f32] {
        self.lfos.values()
    }

    /// Node values committed by the most recent tick.
    pub fn node_values(&self) -> &[f32] {
        &self.nodes
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Rough length of the decay in samples, or `None` if some stage
    /// self-loop doesn't decay at all.
    ///
    /// Each self-looped stage repeats its chain until the loop gain has
    /// fallen 60 dB: `repeats = -3 / log10(gain)`. The longest such tail
    /// plus one pass through every stage is the estimate.
    pub fn estimated_tail_samples(&self) -> Option<f32> {
        let mut through = 0.0;
        let mut longest_loop = 0.0_f32;

        for (index, stage) in self.stages.iter().enumerate() {
            let chain: f32 = stage.allpasses().iter().map(|ap| ap.effective_delay()).sum();
            through += chain;

            let node = index + 1;
            let gain = self.routing.weight(node, node).abs();
            if gain >= 1.0 {
                return None;
            }
            if gain > 1e-3 {
                let repeats = -3.0 / gain.log10();
                longest_loop = longest_loop.max(repeats * chain);
            }
        }

        Some(through + longest_loop)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
