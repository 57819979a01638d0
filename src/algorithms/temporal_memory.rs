//! Temporal Memory implementation.
//!
//! The Temporal Memory learns sequences of column activations. Every step runs
//! four phases against the previous step's cycle:
//!
//! 1. cells that were predictive in an active column become active winners;
//! 2. active columns nobody predicted burst, and one cell per column is picked
//!    as winner (growing a segment for it when learning);
//! 3. when learning, the previous active segments and this step's learning
//!    segments are reinforced and grow synapses from the previous winners;
//! 4. the new active cells drive distal segments, which mark the cells that
//!    are predictive for the next step.
//!
//! The step works on a private [`ComputeCycle`] and commits it to
//! [`Connections`] only once it is complete.

use crate::algorithms::{ComputeCycle, Connections};
use crate::error::{CortexaError, Result};
use crate::types::{CellIdx, ColumnIdx, OrderedMap, OrderedSet, Permanence, Segment, Synapse};

use log::{debug, trace};

/// The sequence memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalMemory;

impl TemporalMemory {
    /// Creates a temporal memory.
    pub fn new() -> Self {
        Self
    }

    /// Runs one step on `active_columns` and commits the resulting cycle.
    ///
    /// Duplicate columns are ignored; an out-of-range column fails before
    /// anything is touched.
    pub fn compute(
        &self,
        c: &mut Connections,
        active_columns: &[ColumnIdx],
        learn: bool,
    ) -> Result<ComputeCycle> {
        let num_columns = c.num_columns();
        if let Some(&bad) = active_columns.iter().find(|&&col| col >= num_columns) {
            return Err(CortexaError::IndexOutOfBounds {
                index: bad,
                size: num_columns,
            });
        }

        let active: OrderedSet<ColumnIdx> = active_columns.iter().copied().collect();
        let prev = c.cycle().clone();
        let cycle = self.compute_fn(c, &active, &prev, learn)?;
        c.apply_cycle(cycle.clone());

        if c.params().tm_verbosity > 0 {
            debug!(
                "TM cycle: {} active, {} winner, {} predictive cells, {} predicted columns",
                cycle.active_cells().len(),
                cycle.winner_cells().len(),
                cycle.predictive_cells().len(),
                cycle.predicted_columns().len()
            );
        }
        Ok(cycle)
    }

    /// One step computed against an explicit previous cycle.
    ///
    /// Bursting may grow segments on `c` and learning changes its synapses;
    /// the cycle state on `c` is left alone.
    pub fn compute_fn(
        &self,
        c: &mut Connections,
        active_columns: &OrderedSet<ColumnIdx>,
        prev: &ComputeCycle,
        learn: bool,
    ) -> Result<ComputeCycle> {
        let mut cycle = ComputeCycle::new();

        self.activate_correctly_predictive_cells(c, &mut cycle, prev.predictive_cells(), active_columns);
        self.burst_columns(c, &mut cycle, active_columns, prev.active_synapses_for_segment())?;

        if learn {
            self.learn_on_segments(
                c,
                prev.active_segments(),
                &cycle.learning_segments,
                prev.active_synapses_for_segment(),
                &cycle.winner_cells,
                prev.winner_cells(),
            )?;
        }

        let active_synapses = self.compute_active_synapses(c, &cycle.active_cells)?;
        self.compute_predictive_cells(c, &mut cycle, &active_synapses);
        cycle.active_synapses_for_segment = active_synapses;

        Ok(cycle)
    }

    /// Clears the carried active, winner and predictive state. Learned
    /// segments survive.
    pub fn reset(&self, c: &mut Connections) {
        c.reset_cycle();
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Phase 1: previously predictive cells in active columns become active
    /// and win; their columns count as predicted.
    pub fn activate_correctly_predictive_cells(
        &self,
        c: &Connections,
        cycle: &mut ComputeCycle,
        prev_predictive_cells: &OrderedSet<CellIdx>,
        active_columns: &OrderedSet<ColumnIdx>,
    ) {
        for &cell in prev_predictive_cells {
            let column = c.column_for_cell(cell);
            if active_columns.contains(&column) {
                cycle.active_cells.insert(cell);
                cycle.winner_cells.insert(cell);
                cycle.predicted_columns.insert(column);
            }
        }
    }

    /// Phase 2: every active column that was not predicted activates all of
    /// its cells and picks one winner.
    ///
    /// The winner's best matching segment becomes a learning segment. Without
    /// a match a fresh segment is grown on it, whether or not the step learns.
    pub fn burst_columns(
        &self,
        c: &mut Connections,
        cycle: &mut ComputeCycle,
        active_columns: &OrderedSet<ColumnIdx>,
        prev_active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
    ) -> Result<()> {
        for &column in active_columns {
            if cycle.predicted_columns.contains(&column) {
                continue;
            }
            cycle.active_cells.extend(c.cells_for_column(column));

            let (best_segment, best_cell) = self.best_matching_cell(c, column, prev_active_synapses)?;
            cycle.winner_cells.insert(best_cell);

            let segment = match best_segment {
                Some(segment) => segment,
                None => {
                    let ordinal = c.segment_count();
                    let segment = c.create_segment(best_cell, ordinal)?;
                    c.set_segment_count(ordinal + 1);
                    segment
                }
            };
            cycle.learning_segments.insert(segment);

            if c.params().tm_verbosity >= 2 {
                trace!("Burst column {column}: winner {best_cell}, segment {segment:?}");
            }
        }
        Ok(())
    }

    /// Phase 3: reinforces and grows segments.
    ///
    /// Each segment in the ordered union of `prev_active_segments` and
    /// `learning_segments` is visited once. Learning segments and segments on
    /// winner cells move their permanences towards the previous activity;
    /// learning segments also grow synapses from `prev_winner_cells` up to
    /// `max_new_synapse_count` active synapses.
    pub fn learn_on_segments(
        &self,
        c: &mut Connections,
        prev_active_segments: &OrderedSet<Segment>,
        learning_segments: &OrderedSet<Segment>,
        prev_active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
        winner_cells: &OrderedSet<CellIdx>,
        prev_winner_cells: &OrderedSet<CellIdx>,
    ) -> Result<()> {
        let inc = c.params().permanence_increment;
        let dec = c.params().permanence_decrement;
        let max_new = c.params().max_new_synapse_count;
        let initial = c.params().initial_permanence;

        let segments: OrderedSet<Segment> = prev_active_segments
            .iter()
            .chain(learning_segments.iter())
            .copied()
            .collect();

        for &segment in &segments {
            if c.segment(segment).is_err() {
                continue;
            }
            let is_learning = learning_segments.contains(&segment);
            let is_from_winner = winner_cells.contains(&c.cell_for_segment(segment)?);
            let active = self.connected_active_synapses(c, segment, prev_active_synapses, 0.0);

            if is_learning || is_from_winner {
                self.adapt_segment(c, segment, &active, inc, dec)?;
            }

            if is_learning {
                let n = max_new.saturating_sub(active.len());
                let cells = self.pick_cells_to_learn_on(c, segment, n, prev_winner_cells)?;
                let mut ordinal = c.synapse_count();
                for cell in cells {
                    c.create_synapse(segment, cell, initial, ordinal)?;
                    ordinal += 1;
                }
                c.set_synapse_count(ordinal);
            }
        }
        Ok(())
    }

    /// Phase 4a: groups the distal synapses sourced from `active_cells` by
    /// segment, in encounter order.
    pub fn compute_active_synapses(
        &self,
        c: &Connections,
        active_cells: &OrderedSet<CellIdx>,
    ) -> Result<OrderedMap<Segment, Vec<Synapse>>> {
        let mut active: OrderedMap<Segment, Vec<Synapse>> = OrderedMap::new();
        for &cell in active_cells {
            for &synapse in c.receptor_synapses(cell) {
                let segment = c.synapse(synapse)?.segment;
                active.entry_or_default(segment).push(synapse);
            }
        }
        Ok(active)
    }

    /// Phase 4b: segments with at least `activation_threshold` connected
    /// active synapses become active and make their cells predictive.
    pub fn compute_predictive_cells(
        &self,
        c: &Connections,
        cycle: &mut ComputeCycle,
        active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
    ) {
        let connected = c.params().connected_permanence;
        let threshold = c.params().activation_threshold;

        for segment in active_synapses.keys() {
            let num_connected = self
                .connected_active_synapses(c, *segment, active_synapses, connected)
                .len();
            if num_connected >= threshold {
                if let Ok(cell) = c.cell_for_segment(*segment) {
                    cycle.active_segments.insert(*segment);
                    cycle.predictive_cells.insert(cell);
                }
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The cell in `column` whose best matching segment has the most active
    /// synapses, with that segment.
    ///
    /// Ties go to the first cell. Without any match the least used cell is
    /// returned with no segment.
    pub fn best_matching_cell(
        &self,
        c: &mut Connections,
        column: ColumnIdx,
        prev_active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
    ) -> Result<(Option<Segment>, CellIdx)> {
        let mut best = None;
        let mut max_synapses = 0;

        for cell in c.cells_for_column(column) {
            if let Some(segment) = self.best_matching_segment(c, cell, prev_active_synapses)? {
                let n = self
                    .connected_active_synapses(c, segment, prev_active_synapses, 0.0)
                    .len();
                if n > max_synapses {
                    max_synapses = n;
                    best = Some((segment, cell));
                }
            }
        }

        match best {
            Some((segment, cell)) => Ok((Some(segment), cell)),
            None => Ok((None, self.least_used_cell(c, column)?)),
        }
    }

    /// The segment of `cell` with the most previously active synapses of
    /// positive permanence, if that count reaches `min_threshold`. Ties go to
    /// the earliest segment.
    pub fn best_matching_segment(
        &self,
        c: &Connections,
        cell: CellIdx,
        prev_active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
    ) -> Result<Option<Segment>> {
        let min_threshold = c.params().min_threshold;
        let mut best = None;
        let mut max_activation = 0;

        for &segment in c.segments_for_cell(cell)? {
            let activation = prev_active_synapses.get(&segment).map_or(0, |synapses| {
                synapses
                    .iter()
                    .filter(|&&s| c.permanence(s).is_some_and(|p| p > 0.0))
                    .count()
            });
            if activation >= min_threshold && (best.is_none() || activation > max_activation) {
                max_activation = activation;
                best = Some(segment);
            }
        }
        Ok(best)
    }

    /// Live synapses of `segment` listed in `active_synapses` with a
    /// permanence of at least `threshold`.
    pub fn connected_active_synapses(
        &self,
        c: &Connections,
        segment: Segment,
        active_synapses: &OrderedMap<Segment, Vec<Synapse>>,
        threshold: Permanence,
    ) -> Vec<Synapse> {
        active_synapses
            .get(&segment)
            .map(|synapses| {
                synapses
                    .iter()
                    .copied()
                    .filter(|&s| c.permanence(s).is_some_and(|p| p >= threshold))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A random cell among those of `column` with the fewest segments.
    pub fn least_used_cell(&self, c: &mut Connections, column: ColumnIdx) -> Result<CellIdx> {
        let mut fewest = usize::MAX;
        let mut candidates = Vec::new();
        for cell in c.cells_for_column(column) {
            let n = c.segments_for_cell(cell)?.len();
            if n < fewest {
                fewest = n;
                candidates.clear();
            }
            if n == fewest {
                candidates.push(cell);
            }
        }

        let i = c.random().get_usize(candidates.len());
        candidates
            .get(i)
            .copied()
            .ok_or(CortexaError::IndexOutOfBounds {
                index: column,
                size: c.num_columns(),
            })
    }

    /// Adds `inc` to the listed synapses of `segment` and subtracts `dec`
    /// from the rest, clamped to [0, 1].
    pub fn adapt_segment(
        &self,
        c: &mut Connections,
        segment: Segment,
        active_synapses: &[Synapse],
        inc: Permanence,
        dec: Permanence,
    ) -> Result<()> {
        let synapses = c.synapses_for_segment(segment)?.to_vec();
        for synapse in synapses {
            let permanence = c.synapse(synapse)?.permanence;
            let delta = if active_synapses.contains(&synapse) { inc } else { -dec };
            c.set_permanence(synapse, permanence + delta)?;
        }
        Ok(())
    }

    /// Up to `n` random cells from `winner_cells` that `segment` has no
    /// synapse from yet.
    pub fn pick_cells_to_learn_on(
        &self,
        c: &mut Connections,
        segment: Segment,
        n: usize,
        winner_cells: &OrderedSet<CellIdx>,
    ) -> Result<Vec<CellIdx>> {
        let existing = c.presynaptic_cells_for_segment(segment)?;
        let mut candidates: Vec<CellIdx> = winner_cells
            .iter()
            .copied()
            .filter(|cell| !existing.contains(cell))
            .collect();
        candidates.sort_unstable();

        let k = n.min(candidates.len());
        Ok(c.random().sample(candidates, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;

    const EPS: Permanence = 1e-6;

    fn connections(columns: usize, cells_per_column: usize) -> Connections {
        let params = Parameters::builder()
            .input_dimensions(vec![32])
            .column_dimensions(vec![columns])
            .cells_per_column(cells_per_column)
            .connected_permanence(0.5)
            .min_threshold(1)
            .activation_threshold(2)
            .permanence_increment(0.1)
            .permanence_decrement(0.1)
            .build()
            .unwrap();
        Connections::new(params).unwrap()
    }

    /// Creates a distal segment with `(presynaptic cell, permanence)` synapses,
    /// advancing both ordinal counters.
    fn segment(c: &mut Connections, cell: CellIdx, synapses: &[(CellIdx, Permanence)]) -> (Segment, Vec<Synapse>) {
        let ordinal = c.segment_count();
        let seg = c.create_segment(cell, ordinal).unwrap();
        c.set_segment_count(ordinal + 1);

        let mut handles = Vec::new();
        for &(source, permanence) in synapses {
            let ordinal = c.synapse_count();
            handles.push(c.create_synapse(seg, source, permanence, ordinal).unwrap());
            c.set_synapse_count(ordinal + 1);
        }
        (seg, handles)
    }

    fn map(entries: &[(Segment, &[Synapse])]) -> OrderedMap<Segment, Vec<Synapse>> {
        let mut m = OrderedMap::new();
        for &(seg, syns) in entries {
            m.insert(seg, syns.to_vec());
        }
        m
    }

    fn set(items: &[usize]) -> OrderedSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_activate_correctly_predictive_cells() {
        let c = connections(2048, 32);
        let tm = TemporalMemory::new();
        let mut cycle = ComputeCycle::new();

        let prev_predictive = set(&[0, 237, 1026, 26337, 26339, 55536]);
        let active_columns = set(&[32, 47, 823]);
        tm.activate_correctly_predictive_cells(&c, &mut cycle, &prev_predictive, &active_columns);

        assert_eq!(cycle.active_cells().as_slice(), &[1026, 26337, 26339]);
        assert_eq!(cycle.winner_cells().as_slice(), &[1026, 26337, 26339]);
        assert_eq!(cycle.predicted_columns().as_slice(), &[32, 823]);
    }

    #[test]
    fn test_activate_correctly_predictive_cells_empty() {
        let c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let mut cycle = ComputeCycle::new();
        tm.activate_correctly_predictive_cells(&c, &mut cycle, &set(&[]), &set(&[32, 47, 823]));
        assert!(cycle.active_cells().is_empty());
        assert!(cycle.predicted_columns().is_empty());

        let mut cycle = ComputeCycle::new();
        tm.activate_correctly_predictive_cells(&c, &mut cycle, &set(&[0, 237, 1026]), &set(&[]));
        assert!(cycle.active_cells().is_empty());
        assert!(cycle.winner_cells().is_empty());
    }

    #[test]
    fn test_burst_columns() {
        let mut c = connections(2048, 4);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd2, s2) = segment(&mut c, 0, &[(49, 0.9), (3, 0.8)]);
        let (dd3, s3) = segment(&mut c, 1, &[(733, 0.7)]);
        let (dd4, _) = segment(&mut c, 108, &[(486, 0.9)]);

        let prev = map(&[(dd, &s[..2]), (dd2, &s2[..1]), (dd3, &s3)]);
        let mut cycle = ComputeCycle::new();
        cycle.predicted_columns.insert(26);

        tm.burst_columns(&mut c, &mut cycle, &set(&[0, 1, 26]), &prev).unwrap();

        assert_eq!(cycle.active_cells().as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        let winners = cycle.winner_cells().as_slice();
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0], 0);
        assert!((4..8).contains(&winners[1]));

        let learning = cycle.learning_segments().as_slice();
        assert_eq!(learning.len(), 2);
        assert_eq!(learning[0], dd);
        assert!(![dd, dd2, dd3, dd4].contains(&learning[1]));
        assert_eq!(c.cell_for_segment(learning[1]).unwrap(), winners[1]);
        assert_eq!(c.segment_count(), 5);
    }

    #[test]
    fn test_burst_columns_empty() {
        let mut c = connections(2048, 4);
        let tm = TemporalMemory::new();
        let mut cycle = ComputeCycle::new();

        tm.burst_columns(&mut c, &mut cycle, &set(&[]), &OrderedMap::new()).unwrap();
        assert!(cycle.active_cells().is_empty());
        assert!(cycle.winner_cells().is_empty());
        assert!(cycle.learning_segments().is_empty());
    }

    #[test]
    fn test_burst_without_learning_still_marks_segments() {
        let mut c = connections(16, 4);
        let tm = TemporalMemory::new();

        let cycle = tm.compute(&mut c, &[2, 5], false).unwrap();
        assert_eq!(cycle.active_cells().len(), 8);
        assert_eq!(cycle.winner_cells().len(), 2);
        assert_eq!(cycle.learning_segments().len(), 2);
        assert_eq!(c.num_segments(), 2);
        assert_eq!(c.num_synapses(), 0);

        for &segment in cycle.learning_segments() {
            let cell = c.cell_for_segment(segment).unwrap();
            assert!(cycle.winner_cells().contains(&cell));
        }
    }

    #[test]
    fn test_learn_on_segments() {
        let params = Parameters::builder()
            .input_dimensions(vec![32])
            .column_dimensions(vec![2048])
            .cells_per_column(32)
            .max_new_synapse_count(2)
            .permanence_increment(0.1)
            .permanence_decrement(0.1)
            .build()
            .unwrap();
        let mut c = Connections::new(params).unwrap();
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 1, &[(733, 0.7)]);
        let (dd2, s2) = segment(&mut c, 8, &[(486, 0.9)]);
        let (dd3, _) = segment(&mut c, 100, &[]);

        let prev_active_segments: OrderedSet<Segment> = [dd, dd2].into_iter().collect();
        let learning: OrderedSet<Segment> = [dd1, dd3].into_iter().collect();
        let prev_map = map(&[(dd, &s[..2]), (dd1, &s1)]);
        let winners = set(&[0]);
        let prev_winners = set(&[10, 11, 12, 13, 14]);

        tm.learn_on_segments(&mut c, &prev_active_segments, &learning, &prev_map, &winners, &prev_winners)
            .unwrap();

        let p = |h: Synapse| c.permanence(h).unwrap();
        assert!((p(s[0]) - 0.7).abs() < EPS);
        assert!((p(s[1]) - 0.5).abs() < EPS);
        assert!((p(s[2]) - 0.8).abs() < EPS);

        assert!((p(s1[0]) - 0.8).abs() < EPS);
        assert_eq!(c.synapses_for_segment(dd1).unwrap().len(), 2);

        assert!((p(s2[0]) - 0.9).abs() < EPS);
        assert_eq!(c.synapses_for_segment(dd2).unwrap().len(), 1);

        let grown = c.presynaptic_cells_for_segment(dd3).unwrap();
        assert_eq!(grown.len(), 2);
        assert!(grown.iter().all(|cell| (10..15).contains(cell)));
        assert_eq!(c.synapse_count(), 8);
    }

    #[test]
    fn test_compute_predictive_cells() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.5), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 1, &[(733, 0.7), (733, 0.4)]);
        let (dd2, s2) = segment(&mut c, 1, &[(974, 0.9)]);
        let _ = segment(&mut c, 8, &[(486, 0.9)]);
        let _ = segment(&mut c, 100, &[]);

        let active = map(&[(dd, &s[..2]), (dd1, &s1), (dd2, &s2)]);
        let mut cycle = ComputeCycle::new();
        tm.compute_predictive_cells(&c, &mut cycle, &active);

        assert_eq!(cycle.active_segments().as_slice(), &[dd]);
        assert_eq!(cycle.predictive_cells().as_slice(), &[0]);
    }

    #[test]
    fn test_compute_active_synapses() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 1, &[(733, 0.7)]);
        let _ = segment(&mut c, 8, &[(486, 0.9)]);

        let active = tm.compute_active_synapses(&c, &set(&[23, 37, 733, 4973])).unwrap();
        assert_eq!(active.keys(), &[dd, dd1]);
        assert_eq!(active.get(&dd).unwrap(), &s[..2]);
        assert_eq!(active.get(&dd1).unwrap(), &s1);

        assert!(tm.compute_active_synapses(&c, &set(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_best_matching_cell() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 0, &[(49, 0.9), (3, 0.8)]);
        let (dd2, s2) = segment(&mut c, 1, &[(733, 0.7)]);
        let _ = segment(&mut c, 1, &[(486, 0.9)]);

        let prev = map(&[(dd, &s[..2]), (dd1, &s1[..1]), (dd2, &s2)]);

        assert_eq!(tm.best_matching_cell(&mut c, 0, &prev).unwrap(), (Some(dd), 0));

        let (seg, cell) = tm.best_matching_cell(&mut c, 3, &prev).unwrap();
        assert_eq!(seg, None);
        assert!((96..128).contains(&cell));

        let (seg, cell) = tm.best_matching_cell(&mut c, 999, &prev).unwrap();
        assert_eq!(seg, None);
        assert!((31968..32000).contains(&cell));
    }

    #[test]
    fn test_best_matching_cell_fewest_segments() {
        let mut c = connections(2, 2);
        let tm = TemporalMemory::new();
        let _ = segment(&mut c, 0, &[(3, 0.3)]);

        for _ in 0..100 {
            let (seg, cell) = tm.best_matching_cell(&mut c, 0, &OrderedMap::new()).unwrap();
            assert_eq!(seg, None);
            assert_eq!(cell, 1);
        }
    }

    #[test]
    fn test_best_matching_segment() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 0, &[(49, 0.9), (3, 0.8)]);
        let (dd2, s2) = segment(&mut c, 1, &[(733, 0.7)]);
        let _ = segment(&mut c, 8, &[(486, 0.9)]);

        let prev = map(&[(dd, &s[..2]), (dd1, &s1[..1]), (dd2, &s2)]);

        assert_eq!(tm.best_matching_segment(&c, 0, &prev).unwrap(), Some(dd));
        assert_eq!(tm.connected_active_synapses(&c, dd, &prev, 0.0), s[..2].to_vec());
        assert_eq!(tm.best_matching_segment(&c, 1, &prev).unwrap(), Some(dd2));
        assert_eq!(tm.best_matching_segment(&c, 8, &prev).unwrap(), None);
        assert_eq!(tm.best_matching_segment(&c, 100, &prev).unwrap(), None);
    }

    #[test]
    fn test_best_matching_segment_first_wins_ties() {
        let mut c = connections(4, 4);
        let tm = TemporalMemory::new();

        let (a, sa) = segment(&mut c, 0, &[(5, 0.3)]);
        let (b, sb) = segment(&mut c, 0, &[(6, 0.3)]);
        let prev = map(&[(a, &sa), (b, &sb)]);
        assert_eq!(tm.best_matching_segment(&c, 0, &prev).unwrap(), Some(a));
    }

    #[test]
    fn test_least_used_cell() {
        let mut c = connections(2, 2);
        let tm = TemporalMemory::new();
        let _ = segment(&mut c, 0, &[(3, 0.3)]);

        for _ in 0..100 {
            assert_eq!(tm.least_used_cell(&mut c, 0).unwrap(), 1);
        }
    }

    #[test]
    fn test_connected_active_synapses() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        let (dd1, s1) = segment(&mut c, 1, &[(733, 0.7)]);
        let (dd2, _) = segment(&mut c, 8, &[(486, 0.9)]);

        let active = map(&[(dd, &s[..2]), (dd1, &s1)]);
        assert_eq!(tm.connected_active_synapses(&c, dd, &active, 0.5), vec![s[0]]);
        assert_eq!(tm.connected_active_synapses(&c, dd1, &active, 0.5), vec![s1[0]]);
        assert!(tm.connected_active_synapses(&c, dd2, &active, 0.5).is_empty());

        c.destroy_synapse(s[0]).unwrap();
        assert!(tm.connected_active_synapses(&c, dd, &active, 0.5).is_empty());
    }

    #[test]
    fn test_adapt_segment() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.6), (37, 0.4), (477, 0.9)]);
        tm.adapt_segment(&mut c, dd, &s[..2], 0.1, 0.1).unwrap();

        assert!((c.permanence(s[0]).unwrap() - 0.7).abs() < EPS);
        assert!((c.permanence(s[1]).unwrap() - 0.5).abs() < EPS);
        assert!((c.permanence(s[2]).unwrap() - 0.8).abs() < EPS);
    }

    #[test]
    fn test_adapt_segment_to_max() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.9)]);
        tm.adapt_segment(&mut c, dd, &s, 0.1, 0.1).unwrap();
        assert!((c.permanence(s[0]).unwrap() - 1.0).abs() < EPS);
        tm.adapt_segment(&mut c, dd, &s, 0.1, 0.1).unwrap();
        assert!((c.permanence(s[0]).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_adapt_segment_to_min() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();

        let (dd, s) = segment(&mut c, 0, &[(23, 0.1)]);
        tm.adapt_segment(&mut c, dd, &[], 0.1, 0.1).unwrap();
        assert!(c.permanence(s[0]).unwrap().abs() < EPS);
        tm.adapt_segment(&mut c, dd, &[], 0.1, 0.1).unwrap();
        assert!(c.permanence(s[0]).unwrap().abs() < EPS);
        assert_eq!(c.synapses_for_segment(dd).unwrap().len(), 1);
    }

    #[test]
    fn test_pick_cells_to_learn_on() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();
        let (dd, _) = segment(&mut c, 0, &[]);
        let winners = set(&[4, 47, 58, 93]);

        let picked = tm.pick_cells_to_learn_on(&mut c, dd, 2, &winners).unwrap();
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|cell| winners.contains(cell)));
        assert_ne!(picked[0], picked[1]);

        let mut picked = tm.pick_cells_to_learn_on(&mut c, dd, 100, &winners).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![4, 47, 58, 93]);

        assert!(tm.pick_cells_to_learn_on(&mut c, dd, 0, &winners).unwrap().is_empty());
    }

    #[test]
    fn test_pick_cells_to_learn_on_avoids_duplicates() {
        let mut c = connections(2048, 32);
        let tm = TemporalMemory::new();
        let (dd, _) = segment(&mut c, 0, &[(23, 0.6)]);

        assert!(tm.pick_cells_to_learn_on(&mut c, dd, 2, &set(&[23])).unwrap().is_empty());
    }

    #[test]
    fn test_compute_rejects_bad_column() {
        let mut c = connections(16, 4);
        let tm = TemporalMemory::new();

        let err = tm.compute(&mut c, &[3, 16], true).unwrap_err();
        assert_eq!(err, CortexaError::IndexOutOfBounds { index: 16, size: 16 });
        assert!(c.active_cells().is_empty());
        assert_eq!(c.num_segments(), 0);
    }

    #[test]
    fn test_compute_commits_cycle() {
        let mut c = connections(16, 4);
        let tm = TemporalMemory::new();

        let cycle = tm.compute(&mut c, &[3, 5, 3], true).unwrap();
        assert_eq!(cycle.active_cells().len(), 8);
        assert_eq!(cycle.winner_cells().len(), 2);
        assert_eq!(c.cycle(), &cycle);
        assert_eq!(c.num_segments(), 2);

        tm.reset(&mut c);
        assert!(c.active_cells().is_empty());
        assert!(c.winner_cells().is_empty());
        assert!(c.predictive_cells().is_empty());
        assert_eq!(c.num_segments(), 2);
    }

    #[test]
    fn test_learns_simple_sequence() {
        let params = Parameters::builder()
            .input_dimensions(vec![32])
            .column_dimensions(vec![50])
            .cells_per_column(4)
            .activation_threshold(2)
            .min_threshold(1)
            .max_new_synapse_count(10)
            .initial_permanence(0.5)
            .connected_permanence(0.5)
            .build()
            .unwrap();
        let mut c = Connections::new(params).unwrap();
        let tm = TemporalMemory::new();

        let a = [0, 1, 2, 3, 4];
        let b = [10, 11, 12, 13, 14];
        for _ in 0..5 {
            tm.reset(&mut c);
            tm.compute(&mut c, &a, true).unwrap();
            tm.compute(&mut c, &b, true).unwrap();
        }

        tm.reset(&mut c);
        let after_a = tm.compute(&mut c, &a, false).unwrap();
        assert_eq!(after_a.active_cells().len(), 20);
        assert_eq!(after_a.predictive_cells().len(), 5);
        assert!(after_a
            .predictive_cells()
            .iter()
            .all(|&cell| b.contains(&c.column_for_cell(cell))));

        let after_b = tm.compute(&mut c, &b, false).unwrap();
        assert_eq!(after_b.predicted_columns().to_sorted_vec(), b.to_vec());
        assert_eq!(after_b.active_cells().len(), 5);
    }
}
