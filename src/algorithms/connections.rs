//! Connections - the shared connectivity model.
//!
//! `Connections` is the single mutable root of the engine. It owns the column
//! and cell topology, every proximal and distal segment and synapse, the per
//! column statistics the spatial pooler maintains, the RNG and the last
//! committed [`ComputeCycle`]. The algorithms themselves are stateless and
//! operate on a `&mut Connections`.
//!
//! Segments and synapses live in append-only arenas addressed by `u32` handles.
//! A handle is never reused or relocated: destroying a segment or synapse only
//! unlinks it and marks its slot dead.

use crate::algorithms::{ComputeCycle, Pool};
use crate::config::Parameters;
use crate::error::{CortexaError, Result};
use crate::matrix::{MatrixShape, SparseBinaryMatrix, SparseObjectMatrix};
use crate::types::{
    clamp_permanence, CellIdx, ColumnIdx, OrderedMap, OrderedSet, Permanence, Real, Segment,
    Synapse,
};
use crate::utils::Random;

use ahash::AHashMap;
use log::{debug, warn};
use smallvec::SmallVec;
use std::ops::Range;

/// What a segment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOwner {
    /// The feed-forward segment of a column.
    Proximal(ColumnIdx),
    /// A lateral segment of a cell.
    Distal(CellIdx),
}

/// Data associated with a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentData {
    /// Column or cell owning this segment.
    pub owner: SegmentOwner,

    /// Caller-supplied creation ordinal (distal segments only).
    pub ordinal: Option<usize>,

    /// The synapses on this segment, in creation order.
    pub synapses: SmallVec<[Synapse; 32]>,

    destroyed: bool,
}

/// Data associated with a synapse.
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseData {
    /// Input bit (proximal) or presynaptic cell (distal).
    pub source: usize,

    /// Connection strength in [0, 1].
    pub permanence: Permanence,

    /// The segment this synapse belongs to.
    pub segment: Segment,

    /// Caller-supplied creation ordinal (distal synapses only).
    pub ordinal: Option<usize>,

    destroyed: bool,
}

/// Data associated with a cell.
#[derive(Debug, Clone, Default, PartialEq)]
struct CellData {
    segments: SmallVec<[Segment; 8]>,
}

/// The connectivity model shared by the spatial pooler and temporal memory.
#[derive(Debug, Clone)]
pub struct Connections {
    params: Parameters,
    input_shape: MatrixShape,
    column_shape: MatrixShape,

    // ========================================================================
    // Structure
    // ========================================================================
    cells: Vec<CellData>,
    segments: Vec<SegmentData>,
    synapses: Vec<SynapseData>,

    /// Distal ordinal -> handle, for idempotent creation.
    segment_ordinals: AHashMap<usize, Segment>,
    synapse_ordinals: AHashMap<usize, Synapse>,

    /// Presynaptic cell -> distal synapses sourced from it, in creation order.
    receptor_synapses: AHashMap<CellIdx, Vec<Synapse>>,

    segment_count: usize,
    synapse_count: usize,

    // ========================================================================
    // Proximal side
    // ========================================================================
    proximal_segments: Vec<Option<Segment>>,
    potential_pools: SparseObjectMatrix<Pool>,

    /// columns × inputs connected bits with per-column counts.
    connected_counts: SparseBinaryMatrix,

    // ========================================================================
    // Column statistics
    // ========================================================================
    overlap_duty_cycles: Vec<Real>,
    active_duty_cycles: Vec<Real>,
    min_overlap_duty_cycles: Vec<Real>,
    min_active_duty_cycles: Vec<Real>,
    boost_factors: Vec<Real>,
    tie_breaker: Vec<Real>,
    inhibition_radius: usize,
    iteration_num: usize,
    iteration_learn_num: usize,

    rng: Random,
    cycle: ComputeCycle,
}

macro_rules! column_stats {
    ($($field:ident, $setter:ident;)*) => {
        $(
            #[doc = concat!("Per-column `", stringify!($field), "`.")]
            #[inline]
            pub fn $field(&self) -> &[Real] {
                &self.$field
            }

            #[doc = concat!("Replaces `", stringify!($field), "`; the length must equal the column count.")]
            pub fn $setter(&mut self, values: Vec<Real>) -> Result<()> {
                self.check_column_vector(values.len())?;
                self.$field = values;
                Ok(())
            }
        )*
    };
}

impl Connections {
    /// Validates `params` and allocates an empty model.
    ///
    /// Proximal pools are created later by `SpatialPooler::init`; distal
    /// segments by the temporal memory as it learns.
    pub fn new(params: Parameters) -> Result<Self> {
        params.validate()?;

        let input_shape = MatrixShape::new(&params.input_dimensions)?;
        let column_shape = MatrixShape::new(&params.column_dimensions)?;
        let num_inputs = input_shape.size();
        let num_columns = column_shape.size();
        let num_cells = num_columns * params.cells_per_column;

        debug!(
            "Connections: {:?} inputs, {:?} columns, {} cells per column",
            params.input_dimensions, params.column_dimensions, params.cells_per_column
        );

        Ok(Self {
            cells: vec![CellData::default(); num_cells],
            segments: Vec::new(),
            synapses: Vec::new(),
            segment_ordinals: AHashMap::new(),
            synapse_ordinals: AHashMap::new(),
            receptor_synapses: AHashMap::new(),
            segment_count: 0,
            synapse_count: 0,

            proximal_segments: vec![None; num_columns],
            potential_pools: SparseObjectMatrix::with_shape(column_shape.clone()),
            connected_counts: SparseBinaryMatrix::with_true_counts(&[num_columns, num_inputs])?,

            overlap_duty_cycles: vec![0.0; num_columns],
            active_duty_cycles: vec![0.0; num_columns],
            min_overlap_duty_cycles: vec![0.0; num_columns],
            min_active_duty_cycles: vec![0.0; num_columns],
            boost_factors: vec![1.0; num_columns],
            tie_breaker: vec![0.0; num_columns],
            inhibition_radius: 0,
            iteration_num: 0,
            iteration_learn_num: 0,

            rng: Random::new(params.seed),
            cycle: ComputeCycle::new(),

            params,
            input_shape,
            column_shape,
        })
    }

    // ========================================================================
    // Configuration and topology
    // ========================================================================

    /// The parameters this model was built from.
    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Shape of the input space.
    #[inline]
    pub fn input_shape(&self) -> &MatrixShape {
        &self.input_shape
    }

    /// Shape of the column space.
    #[inline]
    pub fn column_shape(&self) -> &MatrixShape {
        &self.column_shape
    }

    /// Number of input bits.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_shape.size()
    }

    /// Number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.column_shape.size()
    }

    /// Cells in each column.
    #[inline]
    pub fn cells_per_column(&self) -> usize {
        self.params.cells_per_column
    }

    /// Total number of cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// The column a cell belongs to.
    #[inline]
    pub fn column_for_cell(&self, cell: CellIdx) -> ColumnIdx {
        cell / self.params.cells_per_column
    }

    /// The cells of a column.
    #[inline]
    pub fn cells_for_column(&self, column: ColumnIdx) -> Range<CellIdx> {
        let cpc = self.params.cells_per_column;
        column * cpc..(column + 1) * cpc
    }

    /// The model's random handle.
    #[inline]
    pub fn random(&mut self) -> &mut Random {
        &mut self.rng
    }

    fn check_cell(&self, cell: CellIdx) -> Result<()> {
        if cell >= self.cells.len() {
            return Err(CortexaError::IndexOutOfBounds {
                index: cell,
                size: self.cells.len(),
            });
        }
        Ok(())
    }

    fn check_column(&self, column: ColumnIdx) -> Result<()> {
        if column >= self.num_columns() {
            return Err(CortexaError::IndexOutOfBounds {
                index: column,
                size: self.num_columns(),
            });
        }
        Ok(())
    }

    fn check_column_vector(&self, len: usize) -> Result<()> {
        if len != self.num_columns() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![self.num_columns()],
                actual: vec![len],
            });
        }
        Ok(())
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    /// Live segment data.
    pub fn segment(&self, segment: Segment) -> Result<&SegmentData> {
        match self.segments.get(segment as usize) {
            Some(data) if !data.destroyed => Ok(data),
            _ => Err(CortexaError::UnknownSegment(segment)),
        }
    }

    /// Live synapse data.
    pub fn synapse(&self, synapse: Synapse) -> Result<&SynapseData> {
        match self.synapses.get(synapse as usize) {
            Some(data) if !data.destroyed => Ok(data),
            _ => Err(CortexaError::UnknownSynapse(synapse)),
        }
    }

    /// Permanence of a live synapse, `None` if it was destroyed or never existed.
    #[inline]
    pub fn permanence(&self, synapse: Synapse) -> Option<Permanence> {
        self.synapse(synapse).ok().map(|s| s.permanence)
    }

    /// Number of live segments, proximal included.
    pub fn num_segments(&self) -> usize {
        self.segments.iter().filter(|s| !s.destroyed).count()
    }

    /// Number of live synapses, proximal included.
    pub fn num_synapses(&self) -> usize {
        self.synapses.iter().filter(|s| !s.destroyed).count()
    }

    /// Sets a synapse's permanence, clamped to [0, 1].
    ///
    /// On a proximal synapse the column's connected cache is refreshed too.
    pub fn set_permanence(&mut self, synapse: Synapse, permanence: Permanence) -> Result<()> {
        let (segment, source) = {
            let data = self.synapse(synapse)?;
            (data.segment, data.source)
        };
        let permanence = clamp_permanence(permanence);
        self.synapses[synapse as usize].permanence = permanence;

        if let SegmentOwner::Proximal(column) = self.segments[segment as usize].owner {
            self.refresh_connected(column, source, permanence)?;
        }
        Ok(())
    }

    // ========================================================================
    // Distal segments and synapses
    // ========================================================================

    /// Creates a distal segment on `cell`.
    ///
    /// Creation is idempotent per `ordinal`: a second call with an ordinal that
    /// is already in use returns the existing segment. Callers draw ordinals
    /// from [`segment_count`](Self::segment_count) and bump it afterwards.
    pub fn create_segment(&mut self, cell: CellIdx, ordinal: usize) -> Result<Segment> {
        self.check_cell(cell)?;
        if let Some(&existing) = self.segment_ordinals.get(&ordinal) {
            return Ok(existing);
        }

        let segment = self.push_segment(SegmentOwner::Distal(cell), Some(ordinal));
        self.cells[cell].segments.push(segment);
        self.segment_ordinals.insert(ordinal, segment);
        Ok(segment)
    }

    /// Creates a distal synapse from `presynaptic_cell` onto `segment`.
    ///
    /// Idempotent per `ordinal`, like [`create_segment`](Self::create_segment).
    pub fn create_synapse(
        &mut self,
        segment: Segment,
        presynaptic_cell: CellIdx,
        permanence: Permanence,
        ordinal: usize,
    ) -> Result<Synapse> {
        if !matches!(self.segment(segment)?.owner, SegmentOwner::Distal(_)) {
            return Err(CortexaError::UnknownSegment(segment));
        }
        self.check_cell(presynaptic_cell)?;
        if let Some(&existing) = self.synapse_ordinals.get(&ordinal) {
            return Ok(existing);
        }

        let synapse =
            self.push_synapse(segment, presynaptic_cell, clamp_permanence(permanence), Some(ordinal));
        self.receptor_synapses
            .entry(presynaptic_cell)
            .or_default()
            .push(synapse);
        self.synapse_ordinals.insert(ordinal, synapse);
        Ok(synapse)
    }

    fn push_segment(&mut self, owner: SegmentOwner, ordinal: Option<usize>) -> Segment {
        let segment = self.segments.len() as Segment;
        self.segments.push(SegmentData {
            owner,
            ordinal,
            synapses: SmallVec::new(),
            destroyed: false,
        });
        segment
    }

    fn push_synapse(
        &mut self,
        segment: Segment,
        source: usize,
        permanence: Permanence,
        ordinal: Option<usize>,
    ) -> Synapse {
        let synapse = self.synapses.len() as Synapse;
        self.synapses.push(SynapseData {
            source,
            permanence,
            segment,
            ordinal,
            destroyed: false,
        });
        self.segments[segment as usize].synapses.push(synapse);
        synapse
    }

    /// Unlinks a distal synapse. Its handle stays dead.
    pub fn destroy_synapse(&mut self, synapse: Synapse) -> Result<()> {
        let (segment, source, ordinal) = {
            let data = self.synapse(synapse)?;
            (data.segment, data.source, data.ordinal)
        };
        if !matches!(self.segments[segment as usize].owner, SegmentOwner::Distal(_)) {
            return Err(CortexaError::UnknownSynapse(synapse));
        }

        self.segments[segment as usize]
            .synapses
            .retain(|s| *s != synapse);
        if let Some(receptors) = self.receptor_synapses.get_mut(&source) {
            receptors.retain(|s| *s != synapse);
        }
        if let Some(ordinal) = ordinal {
            self.synapse_ordinals.remove(&ordinal);
        }
        self.synapses[synapse as usize].destroyed = true;
        Ok(())
    }

    /// Unlinks a distal segment and all of its synapses.
    pub fn destroy_segment(&mut self, segment: Segment) -> Result<()> {
        let (cell, ordinal, synapses) = match self.segment(segment)? {
            SegmentData {
                owner: SegmentOwner::Distal(cell),
                ordinal,
                synapses,
                ..
            } => (*cell, *ordinal, synapses.clone()),
            _ => return Err(CortexaError::UnknownSegment(segment)),
        };

        for synapse in synapses {
            self.destroy_synapse(synapse)?;
        }
        self.cells[cell].segments.retain(|s| *s != segment);
        if let Some(ordinal) = ordinal {
            self.segment_ordinals.remove(&ordinal);
        }
        self.segments[segment as usize].destroyed = true;
        Ok(())
    }

    /// Destroys every distal segment. Proximal structure is untouched.
    pub fn clear_distal_segments(&mut self) -> Result<()> {
        let distal: Vec<Segment> = self
            .cells
            .iter()
            .flat_map(|c| c.segments.iter().copied())
            .collect();
        for segment in distal {
            self.destroy_segment(segment)?;
        }
        debug!("Cleared all distal segments");
        Ok(())
    }

    /// Next distal segment ordinal.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Sets the next distal segment ordinal.
    #[inline]
    pub fn set_segment_count(&mut self, count: usize) {
        self.segment_count = count;
    }

    /// Next distal synapse ordinal.
    #[inline]
    pub fn synapse_count(&self) -> usize {
        self.synapse_count
    }

    /// Sets the next distal synapse ordinal.
    #[inline]
    pub fn set_synapse_count(&mut self, count: usize) {
        self.synapse_count = count;
    }

    /// Distal segments of a cell, in creation order.
    pub fn segments_for_cell(&self, cell: CellIdx) -> Result<&[Segment]> {
        self.check_cell(cell)?;
        Ok(&self.cells[cell].segments)
    }

    /// Synapses of a live segment, in creation order.
    pub fn synapses_for_segment(&self, segment: Segment) -> Result<&[Synapse]> {
        Ok(&self.segment(segment)?.synapses)
    }

    /// The cell owning a distal segment.
    pub fn cell_for_segment(&self, segment: Segment) -> Result<CellIdx> {
        match self.segment(segment)?.owner {
            SegmentOwner::Distal(cell) => Ok(cell),
            SegmentOwner::Proximal(_) => Err(CortexaError::UnknownSegment(segment)),
        }
    }

    /// Presynaptic cells of a segment's synapses.
    pub fn presynaptic_cells_for_segment(&self, segment: Segment) -> Result<Vec<CellIdx>> {
        Ok(self
            .synapses_for_segment(segment)?
            .iter()
            .map(|&s| self.synapses[s as usize].source)
            .collect())
    }

    /// Distal synapses sourced from `cell`, in creation order.
    pub fn receptor_synapses(&self, cell: CellIdx) -> &[Synapse] {
        self.receptor_synapses
            .get(&cell)
            .map_or(&[], Vec::as_slice)
    }

    // ========================================================================
    // Proximal pools
    // ========================================================================

    /// Creates `column`'s proximal segment with one zero-permanence synapse per
    /// input in `inputs`.
    pub fn create_proximal_pool(&mut self, column: ColumnIdx, inputs: &[usize]) -> Result<Segment> {
        self.check_column(column)?;
        if self.proximal_segments[column].is_some() {
            return Err(CortexaError::InvalidParameter {
                name: "column",
                message: format!("column {column} already has a potential pool"),
            });
        }
        for &input in inputs {
            self.input_shape.check_index(input)?;
        }

        let segment = self.push_segment(SegmentOwner::Proximal(column), None);
        let mut pool = Pool::new();
        for &input in inputs {
            if pool.contains(input) {
                continue;
            }
            let synapse = self.push_synapse(segment, input, 0.0, None);
            pool.add(input, synapse);
        }

        self.potential_pools.set_index(column, pool)?;
        self.proximal_segments[column] = Some(segment);
        Ok(segment)
    }

    /// `column`'s proximal segment.
    pub fn proximal_segment(&self, column: ColumnIdx) -> Result<Segment> {
        self.check_column(column)?;
        self.proximal_segments[column].ok_or(CortexaError::IndexOutOfBounds {
            index: column,
            size: self.potential_pools.len(),
        })
    }

    /// `column`'s potential pool.
    pub fn potential_pool(&self, column: ColumnIdx) -> Result<&Pool> {
        self.check_column(column)?;
        self.potential_pools
            .get_index(column)
            .ok_or(CortexaError::IndexOutOfBounds {
                index: column,
                size: self.potential_pools.len(),
            })
    }

    /// All potential pools keyed by column.
    #[inline]
    pub fn potential_pools(&self) -> &SparseObjectMatrix<Pool> {
        &self.potential_pools
    }

    /// Writes pool members' permanences from a dense per-input vector.
    ///
    /// Entries for inputs outside the pool are ignored. Values are stored as
    /// given; callers clip and trim beforehand.
    pub fn set_proximal_permanences(&mut self, column: ColumnIdx, dense: &[Permanence]) -> Result<()> {
        if dense.len() != self.num_inputs() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![self.num_inputs()],
                actual: vec![dense.len()],
            });
        }
        let members: Vec<(usize, Synapse)> = self.potential_pool(column)?.iter().collect();
        for (input, synapse) in members {
            let permanence = dense[input];
            self.synapses[synapse as usize].permanence = permanence;
            self.refresh_connected(column, input, permanence)?;
        }
        Ok(())
    }

    /// Writes permanences for the listed inputs only.
    ///
    /// Inputs with no synapse in the pool are logged and skipped.
    pub fn set_proximal_permanences_sparse(
        &mut self,
        column: ColumnIdx,
        permanences: &[Permanence],
        inputs: &[usize],
    ) -> Result<()> {
        if permanences.len() != inputs.len() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![inputs.len()],
                actual: vec![permanences.len()],
            });
        }
        for (&input, &permanence) in inputs.iter().zip(permanences) {
            let synapse = self.potential_pool(column)?.synapse_for_input(input);
            match synapse {
                Some(synapse) => {
                    self.synapses[synapse as usize].permanence = permanence;
                    self.refresh_connected(column, input, permanence)?;
                }
                None => warn!("Column {column} has no synapse on input {input}; skipped"),
            }
        }
        Ok(())
    }

    fn refresh_connected(&mut self, column: ColumnIdx, input: usize, permanence: Permanence) -> Result<()> {
        let connected = permanence >= self.params.syn_perm_connected;
        if let Some(pool) = self.potential_pools.get_index_mut(column) {
            pool.set_connected(input, connected);
        }
        self.connected_counts
            .set_index(column * self.input_shape.size() + input, connected)?;
        Ok(())
    }

    /// Dense per-input permanences of `column` (0 outside the pool).
    pub fn proximal_permanences_dense(&self, column: ColumnIdx) -> Result<Vec<Permanence>> {
        let mut dense = vec![0.0; self.num_inputs()];
        for (input, synapse) in self.potential_pool(column)?.iter() {
            dense[input] = self.synapses[synapse as usize].permanence;
        }
        Ok(dense)
    }

    /// Dense 0/1 connected mask of `column`.
    pub fn connected_synapses_dense(&self, column: ColumnIdx) -> Result<Vec<u8>> {
        self.connected_counts.row(column)
    }

    /// The columns × inputs connected matrix.
    #[inline]
    pub fn connected_counts(&self) -> &SparseBinaryMatrix {
        &self.connected_counts
    }

    // ========================================================================
    // Column statistics
    // ========================================================================

    column_stats! {
        overlap_duty_cycles, set_overlap_duty_cycles;
        active_duty_cycles, set_active_duty_cycles;
        min_overlap_duty_cycles, set_min_overlap_duty_cycles;
        min_active_duty_cycles, set_min_active_duty_cycles;
        boost_factors, set_boost_factors;
        tie_breaker, set_tie_breaker;
    }

    /// Current inhibition radius in column coordinates.
    #[inline]
    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    /// Sets the inhibition radius.
    #[inline]
    pub fn set_inhibition_radius(&mut self, radius: usize) {
        self.inhibition_radius = radius;
    }

    /// Spatial pooler steps taken.
    #[inline]
    pub fn iteration_num(&self) -> usize {
        self.iteration_num
    }

    /// Sets the step counter.
    #[inline]
    pub fn set_iteration_num(&mut self, n: usize) {
        self.iteration_num = n;
    }

    /// Spatial pooler steps taken with learning on.
    #[inline]
    pub fn iteration_learn_num(&self) -> usize {
        self.iteration_learn_num
    }

    /// Sets the learning step counter.
    #[inline]
    pub fn set_iteration_learn_num(&mut self, n: usize) {
        self.iteration_learn_num = n;
    }

    // ========================================================================
    // Compute cycle
    // ========================================================================

    /// The last committed cycle.
    #[inline]
    pub fn cycle(&self) -> &ComputeCycle {
        &self.cycle
    }

    /// Commits a finished cycle as the new previous state.
    pub fn apply_cycle(&mut self, cycle: ComputeCycle) {
        self.cycle = cycle;
    }

    /// Clears the carried cycle state.
    pub fn reset_cycle(&mut self) {
        self.cycle.reset();
    }

    /// Active cells of the last cycle.
    #[inline]
    pub fn active_cells(&self) -> &OrderedSet<CellIdx> {
        self.cycle.active_cells()
    }

    /// Winner cells of the last cycle.
    #[inline]
    pub fn winner_cells(&self) -> &OrderedSet<CellIdx> {
        self.cycle.winner_cells()
    }

    /// Predictive cells of the last cycle.
    #[inline]
    pub fn predictive_cells(&self) -> &OrderedSet<CellIdx> {
        self.cycle.predictive_cells()
    }

    /// Predicted columns of the last cycle.
    #[inline]
    pub fn predicted_columns(&self) -> &OrderedSet<ColumnIdx> {
        self.cycle.predicted_columns()
    }

    /// Active segments of the last cycle.
    #[inline]
    pub fn active_segments(&self) -> &OrderedSet<Segment> {
        self.cycle.active_segments()
    }

    /// Learning segments of the last cycle.
    #[inline]
    pub fn learning_segments(&self) -> &OrderedSet<Segment> {
        self.cycle.learning_segments()
    }

    /// Active synapses per segment of the last cycle.
    #[inline]
    pub fn active_synapses_for_segment(&self) -> &OrderedMap<Segment, Vec<Synapse>> {
        self.cycle.active_synapses_for_segment()
    }
}
