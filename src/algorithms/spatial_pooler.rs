//! Spatial Pooler implementation.
//!
//! The Spatial Pooler turns a dense binary input into a sparse set of active
//! columns. Each column looks at its potential pool through a proximal segment;
//! columns compete on overlap (globally or inside an inhibition neighborhood)
//! and the winners adapt their permanences towards the input. Duty cycles and
//! boost factors keep under-used columns in the game.
//!
//! The pooler itself holds no state. Everything it reads and writes lives on
//! [`Connections`].

use crate::algorithms::Connections;
use crate::error::{CortexaError, Result};
use crate::types::{clamp_permanence, ColumnIdx, Permanence, Real, MAX_PERMANENCE};
use crate::utils::{Topology, WrappingMode};

use log::{debug, trace};

/// The spatial encoder.
///
/// ```rust
/// use cortexa::prelude::*;
///
/// let params = Parameters::builder()
///     .input_dimensions(vec![32])
///     .column_dimensions(vec![64])
///     .potential_radius(4)
///     .global_inhibition(true)
///     .local_area_density(0.1)
///     .build()
///     .unwrap();
/// let mut c = Connections::new(params).unwrap();
/// let sp = SpatialPooler::new();
/// sp.init(&mut c).unwrap();
///
/// let input: Vec<u8> = (0..32).map(|i| u8::from(i % 3 == 0)).collect();
/// let mut active = vec![0u8; 64];
/// let winners = sp.compute(&mut c, &input, &mut active, true, false).unwrap();
/// assert!(winners.len() <= 6);
/// assert_eq!(active.iter().filter(|&&b| b == 1).count(), winners.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialPooler;

impl SpatialPooler {
    /// Creates a spatial pooler.
    pub fn new() -> Self {
        Self
    }

    /// Builds every column's potential pool and initial permanences, then
    /// seeds tie-breakers, the inhibition radius and the duty cycle floors.
    pub fn init(&self, c: &mut Connections) -> Result<()> {
        let wrap = c.params().wrap_around;
        let connected_pct = c.params().init_connected_pct;

        for column in 0..c.num_columns() {
            let potential = self.map_potential(c, column, wrap)?;
            let mut permanences = self.init_permanence(c, &potential, connected_pct);
            c.create_proximal_pool(column, &potential)?;
            self.update_permanences_for_column(c, &mut permanences, column, true)?;
        }

        let num_columns = c.num_columns();
        let tie_breaker = (0..num_columns)
            .map(|_| 0.01 * c.random().get_real64())
            .collect();
        c.set_tie_breaker(tie_breaker)?;

        self.update_inhibition_radius(c)?;
        self.update_min_duty_cycles(c)?;

        debug!(
            "SpatialPooler initialized: {} columns, inhibition radius {}",
            num_columns,
            c.inhibition_radius()
        );
        Ok(())
    }

    /// Runs one step.
    ///
    /// `input` has one byte per input bit (non-zero is active). The winners are
    /// written densely into `active_out` and returned ascending. With learning
    /// off and `infer` on, columns that never won during learning are dropped.
    pub fn compute(
        &self,
        c: &mut Connections,
        input: &[u8],
        active_out: &mut [u8],
        learn: bool,
        infer: bool,
    ) -> Result<Vec<ColumnIdx>> {
        if input.len() != c.num_inputs() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![c.num_inputs()],
                actual: vec![input.len()],
            });
        }
        if active_out.len() != c.num_columns() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![c.num_columns()],
                actual: vec![active_out.len()],
            });
        }

        self.update_bookkeeping_vars(c, learn);

        let overlaps = self.calculate_overlap(c, input)?;
        let boosted: Vec<Real> = overlaps
            .iter()
            .zip(c.boost_factors())
            .map(|(&o, &b)| o * b)
            .collect();

        let mut active = self.inhibit_columns(c, &boosted)?;

        if learn {
            self.adapt_synapses(c, input, &active)?;
            self.update_duty_cycles(c, &overlaps, &active)?;
            self.bump_up_weak_columns(c)?;
            self.update_boost_factors(c)?;

            if self.is_update_round(c) {
                self.update_inhibition_radius(c)?;
                self.update_min_duty_cycles(c)?;
                if c.params().sp_verbosity > 0 {
                    debug!(
                        "SP iteration {}: inhibition radius {}",
                        c.iteration_num(),
                        c.inhibition_radius()
                    );
                }
            }
        } else if infer {
            active = self.strip_never_learned(c, &active);
        }

        active_out.fill(0);
        for &column in &active {
            active_out[column] = 1;
        }

        if c.params().sp_verbosity >= 2 {
            trace!("SP iteration {}: active columns {:?}", c.iteration_num(), active);
        }
        Ok(active)
    }

    fn update_bookkeeping_vars(&self, c: &mut Connections, learn: bool) {
        c.set_iteration_num(c.iteration_num() + 1);
        if learn {
            c.set_iteration_learn_num(c.iteration_learn_num() + 1);
        }
    }

    /// Whether this step refreshes the inhibition radius and duty cycle floors.
    pub fn is_update_round(&self, c: &Connections) -> bool {
        c.iteration_num() % c.params().update_period == 0
    }

    // ========================================================================
    // Topology
    // ========================================================================

    /// The input index at the center of `column`'s receptive field.
    pub fn map_column(&self, c: &Connections, column: ColumnIdx) -> Result<usize> {
        Topology::map_column(column, c.column_shape(), c.input_shape())
    }

    /// The inputs `column` may connect to, ascending.
    ///
    /// Every input within `potential_radius` of the column's center is a
    /// candidate; with `potential_pct < 1` a random subset of
    /// `round(len × potential_pct)` of them is kept.
    pub fn map_potential(&self, c: &mut Connections, column: ColumnIdx, wrap: bool) -> Result<Vec<usize>> {
        let center = self.map_column(c, column)?;
        let radius = c.params().potential_radius;
        let pct = c.params().potential_pct;

        let mut candidates =
            Topology::neighbors_nd(center, c.input_shape(), radius, WrappingMode::from(wrap))?;
        candidates.push(center);
        candidates.sort_unstable();

        if pct < 1.0 {
            let k = (candidates.len() as Real * pct).round() as usize;
            candidates = c.random().sample(candidates, k);
            candidates.sort_unstable();
        }
        Ok(candidates)
    }

    // ========================================================================
    // Permanences
    // ========================================================================

    /// Dense initial permanences for a potential pool.
    ///
    /// With probability `connected_pct` an input starts just above the
    /// connected threshold, otherwise somewhere below it. Values under the trim
    /// threshold become 0; inputs outside the pool stay 0.
    pub fn init_permanence(
        &self,
        c: &mut Connections,
        potential: &[usize],
        connected_pct: Real,
    ) -> Vec<Permanence> {
        let connected = c.params().syn_perm_connected;
        let active_inc = c.params().syn_perm_active_inc;
        let trim = c.params().syn_perm_trim_threshold;

        let mut permanences = vec![0.0; c.num_inputs()];
        for &input in potential {
            let rng = c.random();
            let p = if rng.get_bool_with_prob(connected_pct) {
                connected + rng.get_real64() * active_inc / 4.0
            } else {
                connected * rng.get_real64()
            };
            permanences[input] = if p < trim { 0.0 } else { clamp_permanence(p) };
        }
        permanences
    }

    /// Clips `permanences` to [0, 1], then raises every pool entry until at
    /// least `stimulus_threshold` of them are connected.
    ///
    /// Stops early once every pool entry has reached 1, or straight away when
    /// there is no raise step.
    pub fn raise_permanence_to_threshold(
        &self,
        c: &Connections,
        permanences: &mut [Permanence],
        pool: &[usize],
    ) -> Result<()> {
        if let Some(&input) = pool.iter().find(|&&i| i >= permanences.len()) {
            return Err(CortexaError::IndexOutOfBounds {
                index: input,
                size: permanences.len(),
            });
        }

        let connected = c.params().syn_perm_connected;
        let threshold = c.params().stimulus_threshold;
        let inc = c.params().syn_perm_below_stimulus_inc;

        for p in permanences.iter_mut() {
            *p = clamp_permanence(*p);
        }
        if inc <= 0.0 {
            return Ok(());
        }

        loop {
            let num_connected = pool.iter().filter(|&&i| permanences[i] >= connected).count();
            if num_connected as Real >= threshold {
                break;
            }
            if pool.iter().all(|&i| permanences[i] >= MAX_PERMANENCE) {
                break;
            }
            for &i in pool {
                permanences[i] = clamp_permanence(permanences[i] + inc);
            }
        }
        Ok(())
    }

    /// Optionally raises, then trims and clips `permanences` and commits them
    /// to `column`'s pool, connected bits and counts.
    pub fn update_permanences_for_column(
        &self,
        c: &mut Connections,
        permanences: &mut [Permanence],
        column: ColumnIdx,
        raise: bool,
    ) -> Result<()> {
        if permanences.len() != c.num_inputs() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![c.num_inputs()],
                actual: vec![permanences.len()],
            });
        }

        let pool = c.potential_pool(column)?.inputs().to_vec();
        if raise {
            self.raise_permanence_to_threshold(c, permanences, &pool)?;
        }

        let trim = c.params().syn_perm_trim_threshold;
        for p in permanences.iter_mut() {
            if *p < trim {
                *p = 0.0;
            }
            *p = clamp_permanence(*p);
        }

        c.set_proximal_permanences(column, permanences)
    }

    // ========================================================================
    // Overlap and inhibition
    // ========================================================================

    /// Per column, the number of connected synapses on active inputs. Counts
    /// under `stimulus_threshold` are reported as 0.
    pub fn calculate_overlap(&self, c: &Connections, input: &[u8]) -> Result<Vec<Real>> {
        c.connected_counts()
            .right_vec_sum_at_nz_thresholded(input, c.params().stimulus_threshold, 1.0)
    }

    /// Overlap as a fraction of each column's connected synapse count.
    pub fn calculate_overlap_pct(&self, c: &Connections, overlaps: &[Real]) -> Vec<Real> {
        let counts = c.connected_counts().true_counts();
        overlaps
            .iter()
            .zip(counts)
            .map(|(&o, n)| if n == 0 { 0.0 } else { o / n as Real })
            .collect()
    }

    fn uses_global_inhibition(&self, c: &Connections) -> bool {
        let max_dim = c.column_shape().dimensions().iter().copied().max().unwrap_or(1);
        c.params().global_inhibition || c.inhibition_radius() > max_dim
    }

    fn inhibition_density(&self, c: &Connections) -> Real {
        let density = c.params().local_area_density;
        if density > 0.0 {
            return density;
        }

        let diameter = (2 * c.inhibition_radius() + 1) as Real;
        let num_dims = c.column_shape().num_dimensions() as i32;
        let area = diameter.powi(num_dims).min(c.num_columns() as Real);
        (c.params().num_active_columns_per_inh_area / area).min(0.5)
    }

    /// Picks the winning columns, ascending.
    ///
    /// Columns with a positive overlap get their tie-breaker added before the
    /// competition runs globally or inside each column's neighborhood.
    pub fn inhibit_columns(&self, c: &Connections, overlaps: &[Real]) -> Result<Vec<ColumnIdx>> {
        if overlaps.len() != c.num_columns() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![c.num_columns()],
                actual: vec![overlaps.len()],
            });
        }

        let density = self.inhibition_density(c);
        let working: Vec<Real> = overlaps
            .iter()
            .zip(c.tie_breaker())
            .map(|(&o, &t)| if o > 0.0 { o + t } else { 0.0 })
            .collect();

        if self.uses_global_inhibition(c) {
            Ok(self.inhibit_columns_global(c, &working, density))
        } else {
            self.inhibit_columns_local(c, &working, density)
        }
    }

    /// The top `floor(density × num_columns)` columns with a positive overlap.
    pub fn inhibit_columns_global(&self, c: &Connections, overlaps: &[Real], density: Real) -> Vec<ColumnIdx> {
        let num_active = (density * c.num_columns() as Real) as usize;

        let mut ranked: Vec<ColumnIdx> = (0..overlaps.len()).filter(|&i| overlaps[i] > 0.0).collect();
        ranked.sort_by(|&a, &b| overlaps[b].total_cmp(&overlaps[a]).then(a.cmp(&b)));
        ranked.truncate(num_active);
        ranked.sort_unstable();
        ranked
    }

    /// Neighborhood competition at the current inhibition radius.
    ///
    /// A column wins if its overlap is positive and fewer than
    /// `floor(0.5 + density × (neighbors + 1))` neighbors beat it. Each winner's
    /// overlap is nudged up by a thousandth of the maximum so later columns
    /// resolve ties against it.
    pub fn inhibit_columns_local(
        &self,
        c: &Connections,
        overlaps: &[Real],
        density: Real,
    ) -> Result<Vec<ColumnIdx>> {
        let mut working = overlaps.to_vec();
        let add = working.iter().copied().fold(0.0, Real::max) / 1000.0;
        let radius = c.inhibition_radius();

        let mut winners = Vec::new();
        for column in 0..working.len() {
            if working[column] <= 0.0 {
                continue;
            }
            let neighbors =
                Topology::neighbors_nd(column, c.column_shape(), radius, WrappingMode::NoWrap)?;
            let num_active = (0.5 + density * (neighbors.len() + 1) as Real) as usize;
            let num_bigger = neighbors
                .iter()
                .filter(|&&n| working[n] > working[column])
                .count();

            if num_bigger < num_active {
                winners.push(column);
                working[column] += add;
            }
        }
        Ok(winners)
    }

    // ========================================================================
    // Learning
    // ========================================================================

    /// Moves each active column's pool towards the input: active inputs gain
    /// `syn_perm_active_inc`, the rest lose `syn_perm_inactive_dec`.
    pub fn adapt_synapses(&self, c: &mut Connections, input: &[u8], active: &[ColumnIdx]) -> Result<()> {
        if input.len() != c.num_inputs() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![c.num_inputs()],
                actual: vec![input.len()],
            });
        }
        let inc = c.params().syn_perm_active_inc;
        let dec = c.params().syn_perm_inactive_dec;

        for &column in active {
            let mut permanences = c.proximal_permanences_dense(column)?;
            for &i in c.potential_pool(column)?.inputs() {
                if input[i] != 0 {
                    permanences[i] += inc;
                } else {
                    permanences[i] -= dec;
                }
            }
            self.update_permanences_for_column(c, &mut permanences, column, true)?;
        }
        Ok(())
    }

    /// Folds this step's overlap and activity into the running duty cycles.
    pub fn update_duty_cycles(&self, c: &mut Connections, overlaps: &[Real], active: &[ColumnIdx]) -> Result<()> {
        let period = c.params().duty_cycle_period.min(c.iteration_num()).max(1) as Real;

        let overlap_new: Vec<Real> = overlaps
            .iter()
            .map(|&o| if o > 0.0 { 1.0 } else { 0.0 })
            .collect();
        let mut active_new = vec![0.0; c.num_columns()];
        for &column in active {
            active_new[column] = 1.0;
        }

        let overlap_dc = self.update_duty_cycles_helper(c.overlap_duty_cycles(), &overlap_new, period);
        let active_dc = self.update_duty_cycles_helper(c.active_duty_cycles(), &active_new, period);
        c.set_overlap_duty_cycles(overlap_dc)?;
        c.set_active_duty_cycles(active_dc)
    }

    /// `(dc × (period − 1) + new) / period`, element-wise.
    pub fn update_duty_cycles_helper(&self, duty_cycles: &[Real], new_input: &[Real], period: Real) -> Vec<Real> {
        duty_cycles
            .iter()
            .zip(new_input)
            .map(|(&dc, &v)| (dc * (period - 1.0) + v) / period)
            .collect()
    }

    /// Raises the whole pool of every column whose overlap duty cycle is under
    /// its floor.
    pub fn bump_up_weak_columns(&self, c: &mut Connections) -> Result<()> {
        let inc = c.params().syn_perm_below_stimulus_inc;
        let weak: Vec<ColumnIdx> = c
            .overlap_duty_cycles()
            .iter()
            .zip(c.min_overlap_duty_cycles())
            .enumerate()
            .filter(|(_, (&dc, &floor))| dc < floor)
            .map(|(column, _)| column)
            .collect();

        for column in weak {
            let mut permanences = c.proximal_permanences_dense(column)?;
            for &i in c.potential_pool(column)?.inputs() {
                permanences[i] += inc;
            }
            self.update_permanences_for_column(c, &mut permanences, column, false)?;
        }
        Ok(())
    }

    /// Boost is 1 for columns at or above their active duty floor and grows
    /// linearly to `max_boost` as the duty cycle falls to 0.
    pub fn update_boost_factors(&self, c: &mut Connections) -> Result<()> {
        let max_boost = c.params().max_boost;
        let boost = c
            .active_duty_cycles()
            .iter()
            .zip(c.min_active_duty_cycles())
            .map(|(&duty, &floor)| {
                if floor <= 0.0 || duty >= floor {
                    1.0
                } else {
                    (1.0 - max_boost) / floor * duty + max_boost
                }
            })
            .collect();
        c.set_boost_factors(boost)
    }

    // ========================================================================
    // Homeostasis
    // ========================================================================

    /// Recomputes the inhibition radius.
    ///
    /// Global inhibition uses the largest column dimension. Otherwise the
    /// radius follows the average connected receptive field, scaled into
    /// column space.
    pub fn update_inhibition_radius(&self, c: &mut Connections) -> Result<()> {
        if c.params().global_inhibition {
            let max_dim = c.column_shape().dimensions().iter().copied().max().unwrap_or(1);
            c.set_inhibition_radius(max_dim);
            return Ok(());
        }

        let mut total_span = 0.0;
        for column in 0..c.num_columns() {
            total_span += self.avg_connected_span_for_column(c, column)?;
        }
        let avg_span = total_span / c.num_columns() as Real;
        let diameter = avg_span * self.avg_columns_per_input(c);
        let radius = ((diameter - 1.0) / 2.0).max(1.0).round() as usize;

        c.set_inhibition_radius(radius);
        Ok(())
    }

    /// Mean extent, over input dimensions, of `column`'s connected inputs.
    pub fn avg_connected_span_for_column(&self, c: &Connections, column: ColumnIdx) -> Result<Real> {
        let connected = c.connected_counts().row_sparse(column)?;
        if connected.is_empty() {
            return Ok(0.0);
        }

        let num_dims = c.input_shape().num_dimensions();
        let mut min = vec![usize::MAX; num_dims];
        let mut max = vec![0; num_dims];
        for input in connected {
            let coords = c.input_shape().compute_coordinates(input)?;
            for (d, &x) in coords.iter().enumerate() {
                min[d] = min[d].min(x);
                max[d] = max[d].max(x);
            }
        }

        let total: usize = min.iter().zip(&max).map(|(&lo, &hi)| hi - lo + 1).sum();
        Ok(total as Real / num_dims as Real)
    }

    /// Mean ratio of column to input extent per dimension. A dimension one side
    /// lacks counts as size 1.
    pub fn avg_columns_per_input(&self, c: &Connections) -> Real {
        let column_dims = c.column_shape().dimensions();
        let input_dims = c.input_shape().dimensions();
        let num_dims = column_dims.len().max(input_dims.len());

        let total: Real = (0..num_dims)
            .map(|d| {
                let col = column_dims.get(d).copied().unwrap_or(1) as Real;
                let inp = input_dims.get(d).copied().unwrap_or(1) as Real;
                col / inp
            })
            .sum();
        total / num_dims as Real
    }

    /// Refreshes the overlap and active duty cycle floors.
    pub fn update_min_duty_cycles(&self, c: &mut Connections) -> Result<()> {
        if self.uses_global_inhibition(c) {
            self.update_min_duty_cycles_global(c)
        } else {
            self.update_min_duty_cycles_local(c)
        }
    }

    /// Every floor becomes its percentage of the region-wide maximum.
    pub fn update_min_duty_cycles_global(&self, c: &mut Connections) -> Result<()> {
        let n = c.num_columns();
        let max_overlap = c.overlap_duty_cycles().iter().copied().fold(0.0, Real::max);
        let max_active = c.active_duty_cycles().iter().copied().fold(0.0, Real::max);

        let overlap_floor = c.params().min_pct_overlap_duty_cycles * max_overlap;
        let active_floor = c.params().min_pct_active_duty_cycles * max_active;
        c.set_min_overlap_duty_cycles(vec![overlap_floor; n])?;
        c.set_min_active_duty_cycles(vec![active_floor; n])
    }

    /// Each floor becomes its percentage of the maximum over the column and its
    /// neighbors at the inhibition radius.
    pub fn update_min_duty_cycles_local(&self, c: &mut Connections) -> Result<()> {
        let pct_overlap = c.params().min_pct_overlap_duty_cycles;
        let pct_active = c.params().min_pct_active_duty_cycles;
        let radius = c.inhibition_radius();

        let n = c.num_columns();
        let mut min_overlap = Vec::with_capacity(n);
        let mut min_active = Vec::with_capacity(n);
        for column in 0..n {
            let neighbors =
                Topology::neighbors_nd(column, c.column_shape(), radius, WrappingMode::NoWrap)?;
            let area = || neighbors.iter().copied().chain(std::iter::once(column));

            let max_overlap = area().map(|i| c.overlap_duty_cycles()[i]).fold(0.0, Real::max);
            let max_active = area().map(|i| c.active_duty_cycles()[i]).fold(0.0, Real::max);
            min_overlap.push(pct_overlap * max_overlap);
            min_active.push(pct_active * max_active);
        }

        c.set_min_overlap_duty_cycles(min_overlap)?;
        c.set_min_active_duty_cycles(min_active)
    }

    /// Drops winners that never became active while learning.
    pub fn strip_never_learned(&self, c: &Connections, active: &[ColumnIdx]) -> Vec<ColumnIdx> {
        active
            .iter()
            .copied()
            .filter(|&column| c.active_duty_cycles()[column] > 0.0)
            .collect()
    }
}
