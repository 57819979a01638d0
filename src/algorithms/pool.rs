//! Potential pool of one column's proximal segment.

use crate::types::{OrderedMap, Synapse};
use std::collections::BTreeSet;

/// The inputs a column may connect to, the proximal synapse standing on each,
/// and which of those inputs are currently connected.
///
/// Inputs iterate in the order their synapses were created, which is ascending
/// input order for pools built by the spatial pooler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    synapses: OrderedMap<usize, Synapse>,
    connected: BTreeSet<usize>,
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the synapse standing on `input`. Returns the synapse it replaced.
    pub fn add(&mut self, input: usize, synapse: Synapse) -> Option<Synapse> {
        self.synapses.insert(input, synapse)
    }

    /// The synapse on `input`, if the input is in the pool.
    #[inline]
    pub fn synapse_for_input(&self, input: usize) -> Option<Synapse> {
        self.synapses.get(&input).copied()
    }

    /// Whether `input` is in the pool.
    #[inline]
    pub fn contains(&self, input: usize) -> bool {
        self.synapses.contains_key(&input)
    }

    /// Pool inputs in creation order.
    #[inline]
    pub fn inputs(&self) -> &[usize] {
        self.synapses.keys()
    }

    /// `(input, synapse)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Synapse)> + '_ {
        self.synapses.iter().map(|(input, &syn)| (input, syn))
    }

    /// Pool size.
    #[inline]
    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    /// Whether the pool has no inputs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    /// Marks `input` connected or not. Inputs outside the pool are ignored.
    pub(crate) fn set_connected(&mut self, input: usize, connected: bool) {
        if !self.contains(input) {
            return;
        }
        if connected {
            self.connected.insert(input);
        } else {
            self.connected.remove(&input);
        }
    }

    /// Connected inputs, ascending.
    pub fn connected_inputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.connected.iter().copied()
    }

    /// Number of connected inputs.
    #[inline]
    pub fn num_connected(&self) -> usize {
        self.connected.len()
    }
}
