//! # Reverb Topology Configuration
//!
//! Everything about the network's shape is decided here, before any audio
//! runs: the LFO bank, each stage's allpass list and optional tone filter,
//! the routing between nodes, and the two stereoizer allpasses.
//!
//! A config is plain data (and serde-serializable, so topologies can live
//! in preset files). [`ReverbConfig::validate()`] checks it once; after
//! that the engine built from it has no failure modes.
//!
//! ## Node Numbering
//!
//! ```text
//! 0                 input
//! 1 ..= stages.len() stage i lives at node i + 1
//! stages.len() + 1  output
//! ```
//!
//! ## The Default Topology
//!
//! ```text
//!            ┌──────── 0.7 × feedback ───────┐
//!            ▼                               │
//! in ──► [Stage 0] ──► [Shelf ► Stage 1] ────┼──► [Stage 2] ── 0.5 ──► out
//!        early          size-scaled tank     └───────────────── 0.5 ──►
//!        diffusion
//! ```
//!
//! Stage 0 is a short, fixed-size diffuser. Stage 1 recirculates through a
//! self-loop scaled by the feedback parameter, darkened on every pass by
//! an attached shelf. Stage 2 diffuses the tank output once more. Delays
//! are in samples, as are the LFO amplitudes.

use serde::{Deserialize, Serialize};

use crate::dsp::allpass::{
    AllpassSettings, DelayUnit, ModulatedAllpass, ModulationTarget, MAX_DELAY_SAMPLES,
    MAX_SAMPLE_RATE,
};
use crate::dsp::lfo::{Lfo, LfoBank};
use crate::dsp::routing::{Connection, RoutingTable};
use crate::dsp::stage::ShelfSettings;
use crate::error::ConfigError;

/// Complete description of a reverb network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbConfig {
    /// Unit of every delay, modulation depth and LFO amplitude.
    #[serde(default)]
    pub delay_unit: DelayUnit,
    pub lfos: Vec<LfoConfig>,
    pub stages: Vec<StageConfig>,
    pub routing: RoutingConfig,
    #[serde(default)]
    pub stereoizer: StereoizerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfoConfig {
    pub frequency_hz: f32,
    pub amplitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub allpasses: Vec<AllpassConfig>,
    #[serde(default)]
    pub shelf: Option<ShelfConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllpassConfig {
    pub base_delay: f32,
    pub coefficient: f32,
    #[serde(default = "unit_depth")]
    pub depth: f32,
    #[serde(default)]
    pub modulation: ModulationTarget,
    pub lfo_index: usize,
    /// Follows the global size parameter.
    #[serde(default)]
    pub scale_delay: bool,
    /// Follows the global density parameter.
    #[serde(default)]
    pub scale_coefficient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub cutoff_hz: f32,
    pub gain_db: f32,
    /// Follows the global shelf cutoff/gain parameters.
    #[serde(default)]
    pub attached: bool,
}

/// Routing between nodes, as an edge list or a dense `[src][dst]` matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingConfig {
    Connections(Vec<Connection>),
    Matrix(Vec<Vec<f32>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoizerConfig {
    pub left: AllpassConfig,
    pub right: AllpassConfig,
}

fn unit_depth() -> f32 {
    1.0
}

impl AllpassConfig {
    pub fn new(base_delay: f32, coefficient: f32, lfo_index: usize) -> Self {
        Self {
            base_delay,
            coefficient,
            depth: 1.0,
            modulation: ModulationTarget::DelayTime,
            lfo_index,
            scale_delay: false,
            scale_coefficient: false,
        }
    }

    pub fn scaled(self, scale_delay: bool, scale_coefficient: bool) -> Self {
        Self {
            scale_delay,
            scale_coefficient,
            ..self
        }
    }

    /// Build the runtime allpass. Modulation headroom comes from the peak
    /// amplitude of the LFO this allpass listens to.
    pub fn build(&self, unit: DelayUnit, lfos: &LfoBank) -> ModulatedAllpass {
        ModulatedAllpass::new(self.settings(unit, lfos))
    }

    fn settings(&self, unit: DelayUnit, lfos: &LfoBank) -> AllpassSettings {
        AllpassSettings {
            unit,
            base_delay: self.base_delay,
            coefficient: self.coefficient,
            depth: self.depth,
            modulation: self.modulation,
            lfo_index: self.lfo_index,
            scale_delay: self.scale_delay,
            scale_coefficient: self.scale_coefficient,
            modulation_headroom: self.depth.abs() * lfos.peak(self.lfo_index),
        }
    }

    fn validate(
        &self,
        stage: Option<usize>,
        allpass: usize,
        unit: DelayUnit,
        lfos: &LfoBank,
    ) -> Result<(), ConfigError> {
        let num_lfos = lfos.len();
        if !self.base_delay.is_finite() || self.base_delay < 0.0 {
            return Err(ConfigError::InvalidDelay {
                stage,
                allpass,
                delay: self.base_delay,
            });
        }
        if !self.coefficient.is_finite() || self.coefficient.abs() >= 1.0 {
            return Err(ConfigError::UnstableCoefficient {
                stage,
                allpass,
                coefficient: self.coefficient,
            });
        }
        if !self.depth.is_finite() {
            return Err(ConfigError::InvalidDepth {
                stage,
                allpass,
                depth: self.depth,
            });
        }
        if self.lfo_index >= num_lfos {
            return Err(ConfigError::LfoIndexOutOfRange {
                stage,
                allpass,
                index: self.lfo_index,
                available: num_lfos,
            });
        }

        // Millisecond delays grow with the rate, so check the fastest one.
        let samples = self.settings(unit, lfos).worst_case_delay(MAX_SAMPLE_RATE);
        if !samples.is_finite() || samples > MAX_DELAY_SAMPLES {
            return Err(ConfigError::DelayTooLong {
                stage,
                allpass,
                samples,
                limit: MAX_DELAY_SAMPLES,
            });
        }
        Ok(())
    }
}

impl From<ShelfConfig> for ShelfSettings {
    fn from(config: ShelfConfig) -> Self {
        Self {
            cutoff_hz: config.cutoff_hz,
            gain_db: config.gain_db,
            attached: config.attached,
        }
    }
}

impl RoutingConfig {
    pub fn build(&self, num_nodes: usize) -> Result<RoutingTable, ConfigError> {
        match self {
            Self::Connections(connections) => {
                RoutingTable::from_connections(num_nodes, connections.clone())
            }
            Self::Matrix(matrix) => RoutingTable::from_matrix(num_nodes, matrix),
        }
    }
}

impl ReverbConfig {
    pub fn num_nodes(&self) -> usize {
        self.stages.len() + 2
    }

    pub fn output_node(&self) -> usize {
        self.stages.len() + 1
    }

    /// Build the LFO bank described by `lfos`.
    pub fn build_lfos(&self) -> LfoBank {
        LfoBank::new(
            self.lfos
                .iter()
                .map(|lfo| Lfo::new(lfo.frequency_hz, lfo.amplitude))
                .collect(),
        )
    }

    /// Check every part of the topology, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, lfo) in self.lfos.iter().enumerate() {
            let frequency_ok = lfo.frequency_hz.is_finite() && lfo.frequency_hz >= 0.0;
            if !frequency_ok || !lfo.amplitude.is_finite() {
                return Err(ConfigError::InvalidLfo {
                    index,
                    frequency_hz: lfo.frequency_hz,
                    amplitude: lfo.amplitude,
                });
            }
        }

        let lfos = self.build_lfos();
        for (stage_index, stage) in self.stages.iter().enumerate() {
            for (ap_index, ap) in stage.allpasses.iter().enumerate() {
                ap.validate(Some(stage_index), ap_index, self.delay_unit, &lfos)?;
            }
            if let Some(shelf) = &stage.shelf {
                let cutoff_ok = shelf.cutoff_hz.is_finite() && shelf.cutoff_hz > 0.0;
                if !cutoff_ok || !shelf.gain_db.is_finite() {
                    return Err(ConfigError::InvalidShelf {
                        stage: stage_index,
                        cutoff_hz: shelf.cutoff_hz,
                        gain_db: shelf.gain_db,
                    });
                }
            }
        }

        self.stereoizer.left.validate(None, 0, self.delay_unit, &lfos)?;
        self.stereoizer.right.validate(None, 1, self.delay_unit, &lfos)?;

        self.routing.build(self.num_nodes()).map(|_| ())
    }
}

impl Default for StereoizerConfig {
    /// Two long allpasses of slightly different length on different LFOs.
    fn default() -> Self {
        Self {
            left: AllpassConfig::new(2200.0, 0.5, 0).scaled(true, true),
            right: AllpassConfig::new(2000.0, 0.5, 1).scaled(true, true),
        }
    }
}

impl Default for ReverbConfig {
    /// The shipped "Griffin" topology.
    fn default() -> Self {
        let early: [(f32, usize); 5] = [(80.0, 1), (120.0, 2), (200.0, 0), (280.0, 1), (440.0, 2)];
        let tank: [(f32, usize); 6] = [
            (300.0, 0),
            (700.0, 1),
            (1100.0, 2),
            (1900.0, 0),
            (2300.0, 1),
            (2900.0, 2),
        ];
        let late: [(f32, usize); 5] = [(400.0, 2), (600.0, 1), (1000.0, 0), (1400.0, 2), (2200.0, 1)];

        let chain = |delays: &[(f32, usize)], scaled: bool| -> Vec<AllpassConfig> {
            delays
                .iter()
                .map(|&(delay, lfo)| AllpassConfig::new(delay, 0.5, lfo).scaled(scaled, scaled))
                .collect()
        };

        Self {
            delay_unit: DelayUnit::Samples,
            lfos: vec![
                LfoConfig {
                    frequency_hz: 0.9128,
                    amplitude: 11.0,
                },
                LfoConfig {
                    frequency_hz: 1.1341,
                    amplitude: 9.0,
                },
                LfoConfig {
                    frequency_hz: 1.0,
                    amplitude: 10.0,
                },
            ],
            stages: vec![
                StageConfig {
                    allpasses: chain(&early, false),
                    shelf: None,
                },
                StageConfig {
                    allpasses: chain(&tank, true),
                    shelf: Some(ShelfConfig {
                        cutoff_hz: 8000.0,
                        gain_db: -6.0,
                        attached: true,
                    }),
                },
                StageConfig {
                    allpasses: chain(&late, true),
                    shelf: None,
                },
            ],
            routing: RoutingConfig::Connections(vec![
                Connection::new(0, 1, 1.0),
                Connection::new(1, 2, 1.0),
                Connection::feedback(2, 2, 0.7),
                Connection::new(2, 3, 1.0),
                Connection::new(2, 4, 0.5),
                Connection::new(3, 4, 0.5),
            ]),
            stereoizer: StereoizerConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReverbConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.num_nodes(), 5);
        assert_eq!(config.output_node(), 4);
    }

    #[test]
    fn test_rejects_out_of_range_lfo_index() {
        let mut config = ReverbConfig::default();
        config.stages[1].allpasses[3].lfo_index = 3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::LfoIndexOutOfRange {
                stage: Some(1),
                allpass: 3,
                index: 3,
                available: 3,
            })
        );
    }

    #[test]
    fn test_rejects_unstable_coefficient() {
        for coefficient in [1.0, -1.5, f32::NAN] {
            let mut config = ReverbConfig::default();
            config.stages[0].allpasses[0].coefficient = coefficient;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::UnstableCoefficient { stage: Some(0), allpass: 0, .. })
            ));
        }
    }

    #[test]
    fn test_rejects_negative_delay() {
        let mut config = ReverbConfig::default();
        config.stages[2].allpasses[1].base_delay = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDelay { stage: Some(2), allpass: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_stereoizer_allpass() {
        let mut config = ReverbConfig::default();
        config.stereoizer.right.lfo_index = 9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LfoIndexOutOfRange { stage: None, allpass: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_lfo_and_shelf() {
        let mut config = ReverbConfig::default();
        config.lfos[1].frequency_hz = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLfo { index: 1, .. })));

        let mut config = ReverbConfig::default();
        config.stages[1].shelf = Some(ShelfConfig {
            cutoff_hz: 0.0,
            gain_db: -6.0,
            attached: true,
        });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidShelf { stage: 1, .. })));
    }

    /// Delays whose buffers could not be allocated are refused up front,
    /// before prepare() ever sizes them.
    #[test]
    fn test_rejects_delay_beyond_buffer_limit() {
        let mut config = ReverbConfig::default();
        config.stages[1].allpasses[2].base_delay = 1.0e30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayTooLong { stage: Some(1), allpass: 2, .. })
        ));

        let mut config = ReverbConfig::default();
        config.stages[0].allpasses[0].base_delay = 1.0e9;
        assert!(matches!(config.validate(), Err(ConfigError::DelayTooLong { .. })));
    }

    /// The limit is in samples, so a millisecond delay is checked at the
    /// fastest supported rate: 5 s passes, 10 s × 2 (size) at 384 kHz does not.
    #[test]
    fn test_delay_limit_applies_to_milliseconds() {
        let mut config = ReverbConfig::default();
        config.delay_unit = DelayUnit::Milliseconds;
        for lfo in &mut config.lfos {
            lfo.amplitude = 0.5;
        }
        config.stages[1].allpasses[0].base_delay = 5000.0;
        assert_eq!(config.validate(), Ok(()));

        config.stages[1].allpasses[0].base_delay = 10_000.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayTooLong { stage: Some(1), allpass: 0, .. })
        ));
    }

    /// A routing matrix sized for the wrong number of stages is caught.
    #[test]
    fn test_rejects_matrix_for_wrong_node_count() {
        let mut config = ReverbConfig::default();
        config.routing = RoutingConfig::Matrix(vec![vec![0.0; 4]; 4]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MatrixRows {
                expected: 5,
                found: 4
            })
        );
    }

    /// The headroom reserved by an allpass follows its LFO's amplitude.
    #[test]
    fn test_build_reserves_lfo_headroom() {
        let config = ReverbConfig::default();
        let lfos = config.build_lfos();

        // 440 × 2 + 10 (LFO 2) + margin = 894 → 1024
        let mut ap = config.stages[0].allpasses[4].build(config.delay_unit, &lfos);
        ap.prepare(44100.0);
        assert_eq!(ap.buffer_len(), 1024);
    }

    /// A topology written by hand in JSON, leaning on the serde defaults.
    #[test]
    fn test_parses_json_preset() {
        let json = r#"{
            "delay_unit": "milliseconds",
            "lfos": [{ "frequency_hz": 0.5, "amplitude": 0.2 }],
            "stages": [
                {
                    "allpasses": [
                        { "base_delay": 4.7, "coefficient": 0.6, "lfo_index": 0, "scale_delay": true },
                        { "base_delay": 3.1, "coefficient": 0.4, "lfo_index": 0,
                          "modulation": "coefficient", "depth": 0.1 }
                    ],
                    "shelf": { "cutoff_hz": 6000.0, "gain_db": -4.0 }
                }
            ],
            "routing": { "matrix": [
                [0.0, 1.0, 0.0],
                [0.0, 0.5, 1.0],
                [0.0, 0.0, 0.0]
            ] },
            "stereoizer": {
                "left":  { "base_delay": 20.0, "coefficient": 0.5, "lfo_index": 0 },
                "right": { "base_delay": 23.0, "coefficient": 0.5, "lfo_index": 0 }
            }
        }"#;

        let config: ReverbConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.delay_unit, DelayUnit::Milliseconds);

        let first = config.stages[0].allpasses[0];
        assert_eq!(first.depth, 1.0);
        assert_eq!(first.modulation, ModulationTarget::DelayTime);
        assert!(first.scale_delay && !first.scale_coefficient);

        let second = config.stages[0].allpasses[1];
        assert_eq!(second.modulation, ModulationTarget::Coefficient);
        assert!(!config.stages[0].shelf.unwrap().attached);
    }
}
