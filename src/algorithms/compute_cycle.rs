//! One temporal memory step's outputs.

use crate::types::{CellIdx, ColumnIdx, OrderedMap, OrderedSet, Segment, Synapse};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The sets produced by a single temporal memory step.
///
/// A cycle is built privately while the step runs and is committed to the
/// connections in one piece afterwards; the committed cycle is the "previous"
/// state the next step reads. Every set iterates in the order its members were
/// produced.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComputeCycle {
    pub(crate) active_cells: OrderedSet<CellIdx>,
    pub(crate) winner_cells: OrderedSet<CellIdx>,
    pub(crate) predictive_cells: OrderedSet<CellIdx>,
    pub(crate) predicted_columns: OrderedSet<ColumnIdx>,
    pub(crate) active_segments: OrderedSet<Segment>,
    pub(crate) learning_segments: OrderedSet<Segment>,
    pub(crate) active_synapses_for_segment: OrderedMap<Segment, Vec<Synapse>>,
}

impl ComputeCycle {
    /// An empty cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells active this step.
    #[inline]
    pub fn active_cells(&self) -> &OrderedSet<CellIdx> {
        &self.active_cells
    }

    /// Cells chosen to represent their column this step.
    #[inline]
    pub fn winner_cells(&self) -> &OrderedSet<CellIdx> {
        &self.winner_cells
    }

    /// Cells predicted to become active next step.
    #[inline]
    pub fn predictive_cells(&self) -> &OrderedSet<CellIdx> {
        &self.predictive_cells
    }

    /// Active columns that contained a previously predictive cell.
    #[inline]
    pub fn predicted_columns(&self) -> &OrderedSet<ColumnIdx> {
        &self.predicted_columns
    }

    /// Segments whose connected active synapses reached the activation threshold.
    #[inline]
    pub fn active_segments(&self) -> &OrderedSet<Segment> {
        &self.active_segments
    }

    /// Segments selected for reinforcement and growth this step.
    #[inline]
    pub fn learning_segments(&self) -> &OrderedSet<Segment> {
        &self.learning_segments
    }

    /// For each segment touched by an active cell, those synapses.
    #[inline]
    pub fn active_synapses_for_segment(&self) -> &OrderedMap<Segment, Vec<Synapse>> {
        &self.active_synapses_for_segment
    }

    /// Clears the sets that carry into the next step.
    pub fn reset(&mut self) {
        self.active_cells.clear();
        self.winner_cells.clear();
        self.predictive_cells.clear();
        self.active_segments.clear();
        self.active_synapses_for_segment.clear();
    }
}
