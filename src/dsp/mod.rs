//! # DSP Building Blocks
//!
//! From the bottom up:
//!
//! - **`lfo`**: parabolic-sine oscillators and the shared LFO bank.
//! - **`allpass`**: the modulated, fractionally-delayed allpass every
//!   stage is built from.
//! - **`shelf`**: a one-pole high shelf for darkening a stage.
//! - **`stage`**: an optional shelf followed by an allpass chain.
//! - **`routing`**: weighted edges between input, stages and output.
//! - **`engine`**: runs all stages through the routing table, one tick at
//!   a time.
//! - **`stereoizer`**: splits the mono result into two channels.

pub mod allpass;
pub mod engine;
pub mod lfo;
pub mod routing;
pub mod shelf;
pub mod stage;
pub mod stereoizer;
