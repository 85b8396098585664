//! # Configuration Errors
//!
//! The engine has no runtime failure modes: once a [`MultistageReverb`]
//! exists, every call to `process_sample()` completes in constant time and
//! never returns an error. Everything that *can* go wrong is a mistake in
//! the topology description, and all of it is caught here, once, when the
//! engine is built.
//!
//! [`MultistageReverb`]: crate::dsp::engine::MultistageReverb

use thiserror::Error;

/// A problem found while validating a [`ReverbConfig`](crate::config::ReverbConfig).
///
/// Stage and allpass positions are zero-based indices into the config's
/// `stages` and `allpasses` lists. The stereoizer channels are reported
/// with `stage: None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("allpass {allpass} in {} references LFO {index}, but only {available} LFOs exist", describe_stage(.stage))]
    LfoIndexOutOfRange {
        stage: Option<usize>,
        allpass: usize,
        index: usize,
        available: usize,
    },

    #[error("allpass {allpass} in {} has coefficient {coefficient}; |g| must be below 1", describe_stage(.stage))]
    UnstableCoefficient {
        stage: Option<usize>,
        allpass: usize,
        coefficient: f32,
    },

    #[error("allpass {allpass} in {} has invalid base delay {delay}", describe_stage(.stage))]
    InvalidDelay {
        stage: Option<usize>,
        allpass: usize,
        delay: f32,
    },

    #[error("allpass {allpass} in {} needs up to {samples} samples of delay; the limit is {limit}", describe_stage(.stage))]
    DelayTooLong {
        stage: Option<usize>,
        allpass: usize,
        samples: f32,
        limit: f32,
    },

    #[error("allpass {allpass} in {} has non-finite modulation depth {depth}", describe_stage(.stage))]
    InvalidDepth {
        stage: Option<usize>,
        allpass: usize,
        depth: f32,
    },

    #[error("LFO {index} has invalid frequency {frequency_hz} Hz or amplitude {amplitude}")]
    InvalidLfo {
        index: usize,
        frequency_hz: f32,
        amplitude: f32,
    },

    #[error("stage {stage} has invalid shelf settings ({cutoff_hz} Hz, {gain_db} dB)")]
    InvalidShelf {
        stage: usize,
        cutoff_hz: f32,
        gain_db: f32,
    },

    #[error("connection {src} -> {dst} is outside the {num_nodes}-node graph")]
    NodeOutOfRange {
        src: usize,
        dst: usize,
        num_nodes: usize,
    },

    #[error("connection {src} -> 0 feeds the input node, which only accepts external audio")]
    EdgeIntoInput { src: usize },

    #[error("connection {src} -> {dst} has non-finite weight {weight}")]
    InvalidWeight { src: usize, dst: usize, weight: f32 },

    #[error("routing matrix must have {expected} rows, found {found}")]
    MatrixRows { expected: usize, found: usize },

    #[error("routing matrix row {row} must have {expected} columns, found {found}")]
    MatrixColumns {
        row: usize,
        expected: usize,
        found: usize,
    },
}

fn describe_stage(stage: &Option<usize>) -> String {
    match stage {
        Some(index) => format!("stage {index}"),
        None => "the stereoizer".to_string(),
    }
}
