//! # Routing Table
//!
//! The engine's graph has `num_stages + 2` nodes:
//!
//! ```text
//! node 0               input   (external audio only, never a destination)
//! nodes 1..=num_stages one per stage
//! node num_nodes - 1   output  (a plain weighted sum)
//! ```
//!
//! Edges are kept as a list of [`Connection`]s and flattened into a dense
//! row-major matrix: `weight(src, dst)` lives at `src * num_nodes + dst`,
//! i.e. **rows are sources, columns are destinations**. The same
//! convention is used for matrices supplied directly.
//!
//! Connections flagged `scales_with_feedback` follow the global feedback
//! parameter; every other edge keeps its base weight.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A weighted edge `src → dst`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub src: usize,
    pub dst: usize,
    pub weight: f32,
    #[serde(default)]
    pub scales_with_feedback: bool,
}

impl Connection {
    pub fn new(src: usize, dst: usize, weight: f32) -> Self {
        Self {
            src,
            dst,
            weight,
            scales_with_feedback: false,
        }
    }

    /// An edge whose weight becomes `weight * feedback` when the global
    /// feedback parameter changes.
    pub fn feedback(src: usize, dst: usize, weight: f32) -> Self {
        Self {
            scales_with_feedback: true,
            ..Self::new(src, dst, weight)
        }
    }
}

/// Dense, validated routing weights for a fixed node count.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    num_nodes: usize,
    connections: Vec<Connection>,

    /// Effective weights, row-major `[src][dst]`.
    weights: Vec<f32>,
}

impl RoutingTable {
    /// Build from an explicit connection list. Parallel edges between the
    /// same pair of nodes add up.
    pub fn from_connections(
        num_nodes: usize,
        connections: Vec<Connection>,
    ) -> Result<Self, ConfigError> {
        for c in &connections {
            if c.src >= num_nodes || c.dst >= num_nodes {
                return Err(ConfigError::NodeOutOfRange {
                    src: c.src,
                    dst: c.dst,
                    num_nodes,
                });
            }
            if c.dst == 0 {
                return Err(ConfigError::EdgeIntoInput { src: c.src });
            }
            if !c.weight.is_finite() {
                return Err(ConfigError::InvalidWeight {
                    src: c.src,
                    dst: c.dst,
                    weight: c.weight,
                });
            }
        }

        let mut table = Self {
            num_nodes,
            connections,
            weights: vec![0.0; num_nodes * num_nodes],
        };
        table.apply_feedback(1.0);
        Ok(table)
    }

    /// Build from a square row-major matrix (`matrix[src][dst]`). Zero
    /// entries are dropped; no edge follows the feedback parameter.
    pub fn from_matrix(num_nodes: usize, matrix: &[Vec<f32>]) -> Result<Self, ConfigError> {
        if matrix.len() != num_nodes {
            return Err(ConfigError::MatrixRows {
                expected: num_nodes,
                found: matrix.len(),
            });
        }

        let mut connections = Vec::new();
        for (src, row) in matrix.iter().enumerate() {
            if row.len() != num_nodes {
                return Err(ConfigError::MatrixColumns {
                    row: src,
                    expected: num_nodes,
                    found: row.len(),
                });
            }
            for (dst, &weight) in row.iter().enumerate() {
                if weight != 0.0 {
                    connections.push(Connection::new(src, dst, weight));
                }
            }
        }

        Self::from_connections(num_nodes, connections)
    }

    /// Set every flagged edge to `base * feedback`; unflagged edges go back
    /// to their base weight.
    pub fn apply_feedback(&mut self, feedback: f32) {
        self.weights.fill(0.0);
        for c in &self.connections {
            let weight = if c.scales_with_feedback {
                c.weight * feedback
            } else {
                c.weight
            };
            self.weights[c.src * self.num_nodes + c.dst] += weight;
        }
    }

    #[inline]
    pub fn weight(&self, src: usize, dst: usize) -> f32 {
        self.weights[src * self.num_nodes + dst]
    }

    /// Weighted sum of `nodes` flowing into `dst`: `Σ nodes[i] * w(i, dst)`.
    #[inline]
    pub fn gather(&self, nodes: &[f32], dst: usize) -> f32 {
        nodes
            .iter()
            .enumerate()
            .map(|(src, &value)| value * self.weights[src * self.num_nodes + dst])
            .sum()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
