//! Typed, range-checked configuration for the whole engine.
//!
//! One [`Parameters`] value configures the connectivity model, the spatial
//! pooler and the temporal memory. Values are validated once on
//! [`ParametersBuilder::build`] and again by `Connections::new`, so nothing
//! downstream has to re-check ranges.

use crate::error::{CortexaError, Result};
use crate::types::{Permanence, Real};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Parameters {
    // ========================================================================
    // Topology
    // ========================================================================
    /// Shape of the input space.
    pub input_dimensions: Vec<usize>,

    /// Shape of the column space.
    pub column_dimensions: Vec<usize>,

    /// Cells in each column.
    pub cells_per_column: usize,

    /// Radius (in input coordinates) of each column's potential pool.
    pub potential_radius: usize,

    /// Fraction of the radius neighborhood kept in a potential pool, in (0, 1].
    pub potential_pct: Real,

    /// Whether potential pools wrap around input edges.
    pub wrap_around: bool,

    // ========================================================================
    // Inhibition
    // ========================================================================
    /// Compete across the whole region instead of per neighborhood.
    pub global_inhibition: bool,

    /// Target fraction of active columns. Values ≤ 0 disable it in favour of
    /// `num_active_columns_per_inh_area`.
    pub local_area_density: Real,

    /// Target active columns per inhibition area.
    pub num_active_columns_per_inh_area: Real,

    /// Overlaps below this are treated as 0.
    pub stimulus_threshold: Real,

    // ========================================================================
    // Proximal learning
    // ========================================================================
    /// Decrement applied to pool synapses on inactive inputs.
    pub syn_perm_inactive_dec: Permanence,
    /// Increment applied to pool synapses on active inputs.
    pub syn_perm_active_inc: Permanence,
    /// Proximal connected threshold.
    pub syn_perm_connected: Permanence,
    /// Step used when raising weak columns.
    pub syn_perm_below_stimulus_inc: Permanence,

    /// Proximal permanences below this are zeroed.
    pub syn_perm_trim_threshold: Permanence,

    /// Fraction of potential synapses initialised above the connected threshold.
    pub init_connected_pct: Real,

    // ========================================================================
    // Duty cycles and boosting
    // ========================================================================
    /// Overlap duty floor as a fraction of the neighborhood maximum.
    pub min_pct_overlap_duty_cycles: Real,
    /// Active duty floor as a fraction of the neighborhood maximum.
    pub min_pct_active_duty_cycles: Real,
    /// Averaging window of the duty cycles.
    pub duty_cycle_period: usize,
    /// Boost of a column that never fires.
    pub max_boost: Real,

    /// Iterations between inhibition radius / duty floor refreshes.
    pub update_period: usize,

    // ========================================================================
    // Distal (sequence) learning
    // ========================================================================
    /// Connected active synapses needed for a segment to become active.
    pub activation_threshold: usize,

    /// Active synapses needed for a segment to count as matching.
    pub min_threshold: usize,

    /// Upper bound on synapses grown per learning segment per step.
    pub max_new_synapse_count: usize,

    /// Permanence of newly grown distal synapses.
    pub initial_permanence: Permanence,
    /// Distal connected threshold.
    pub connected_permanence: Permanence,
    /// Distal reinforcement step.
    pub permanence_increment: Permanence,
    /// Distal punishment step.
    pub permanence_decrement: Permanence,

    // ========================================================================
    // Misc
    // ========================================================================
    /// RNG seed. Negative draws a seed from entropy.
    pub seed: i64,

    /// Spatial pooler log detail, 0 to 10.
    pub sp_verbosity: u32,
    /// Temporal memory log detail, 0 to 10.
    pub tm_verbosity: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            input_dimensions: vec![32, 32],
            column_dimensions: vec![64, 64],
            cells_per_column: 32,
            potential_radius: 16,
            potential_pct: 0.5,
            wrap_around: true,
            global_inhibition: false,
            local_area_density: -1.0,
            num_active_columns_per_inh_area: 10.0,
            stimulus_threshold: 0.0,
            syn_perm_inactive_dec: 0.01,
            syn_perm_active_inc: 0.1,
            syn_perm_connected: 0.1,
            syn_perm_below_stimulus_inc: 0.01,
            syn_perm_trim_threshold: 0.05,
            init_connected_pct: 0.5,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            update_period: 50,
            activation_threshold: 13,
            min_threshold: 10,
            max_new_synapse_count: 20,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.1,
            permanence_decrement: 0.1,
            seed: 42,
            sp_verbosity: 0,
            tm_verbosity: 0,
        }
    }
}

fn invalid(name: &'static str, message: impl Into<String>) -> CortexaError {
    CortexaError::InvalidParameter {
        name,
        message: message.into(),
    }
}

fn check_closed(name: &'static str, value: Real, min: Real, max: Real) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(invalid(name, format!("{value} is outside [{min}, {max}]")));
    }
    Ok(())
}

fn check_dimensions(name: &'static str, dims: &[usize]) -> Result<()> {
    if dims.is_empty() {
        return Err(invalid(name, "cannot be empty"));
    }
    if dims.contains(&0) {
        return Err(invalid(name, format!("zero-sized dimension in {dims:?}")));
    }
    Ok(())
}

impl Parameters {
    /// Starts a builder from the defaults.
    #[must_use]
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Total number of input bits.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    /// Total number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// Total number of cells.
    #[must_use]
    pub fn num_cells(&self) -> usize {
        self.num_columns() * self.cells_per_column
    }

    /// Checks every value against its allowed range.
    ///
    /// All intervals are inclusive unless noted.
    pub fn validate(&self) -> Result<()> {
        check_dimensions("input_dimensions", &self.input_dimensions)?;
        check_dimensions("column_dimensions", &self.column_dimensions)?;

        if self.cells_per_column == 0 {
            return Err(invalid("cells_per_column", "must be at least 1"));
        }
        if self.potential_pct <= 0.0 || self.potential_pct > 1.0 {
            return Err(invalid(
                "potential_pct",
                format!("{} is outside (0, 1]", self.potential_pct),
            ));
        }

        if self.local_area_density > 0.0 {
            check_closed("local_area_density", self.local_area_density, 0.0, 1.0)?;
        } else if self.num_active_columns_per_inh_area <= 0.0 {
            return Err(invalid(
                "num_active_columns_per_inh_area",
                "must be > 0 when local_area_density is disabled",
            ));
        }
        if self.stimulus_threshold < 0.0 {
            return Err(invalid("stimulus_threshold", "cannot be negative"));
        }

        let unit_fields = [
            ("syn_perm_inactive_dec", self.syn_perm_inactive_dec),
            ("syn_perm_active_inc", self.syn_perm_active_inc),
            ("syn_perm_connected", self.syn_perm_connected),
            ("syn_perm_below_stimulus_inc", self.syn_perm_below_stimulus_inc),
            ("syn_perm_trim_threshold", self.syn_perm_trim_threshold),
            ("init_connected_pct", self.init_connected_pct),
            ("min_pct_overlap_duty_cycles", self.min_pct_overlap_duty_cycles),
            ("min_pct_active_duty_cycles", self.min_pct_active_duty_cycles),
            ("initial_permanence", self.initial_permanence),
            ("connected_permanence", self.connected_permanence),
            ("permanence_increment", self.permanence_increment),
            ("permanence_decrement", self.permanence_decrement),
        ];
        for (name, value) in unit_fields {
            check_closed(name, value, 0.0, 1.0)?;
        }
        if self.stimulus_threshold > 0.0 && self.syn_perm_below_stimulus_inc <= 0.0 {
            return Err(invalid(
                "syn_perm_below_stimulus_inc",
                "must be > 0 when stimulus_threshold is positive",
            ));
        }

        if self.duty_cycle_period == 0 {
            return Err(invalid("duty_cycle_period", "must be at least 1"));
        }
        if self.update_period == 0 {
            return Err(invalid("update_period", "must be at least 1"));
        }
        if self.max_boost < 1.0 {
            return Err(invalid("max_boost", format!("{} is below 1", self.max_boost)));
        }
        if self.sp_verbosity > 10 {
            return Err(invalid("sp_verbosity", "must be in [0, 10]"));
        }
        if self.tm_verbosity > 10 {
            return Err(invalid("tm_verbosity", "must be in [0, 10]"));
        }

        Ok(())
    }

    /// Parses parameters from JSON, filling omitted keys with defaults, and
    /// validates the result.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| CortexaError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

/// Chained construction of [`Parameters`].
///
/// ```rust
/// use cortexa::config::Parameters;
///
/// let params = Parameters::builder()
///     .input_dimensions(vec![100])
///     .column_dimensions(vec![200])
///     .global_inhibition(true)
///     .build()
///     .unwrap();
/// assert_eq!(params.num_columns(), 200);
///
/// assert!(Parameters::builder().potential_pct(1.5).build().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    params: Parameters,
}

macro_rules! setters {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Sets `", stringify!($field), "`.")]
            #[must_use]
            pub fn $field(mut self, value: $ty) -> Self {
                self.params.$field = value;
                self
            }
        )*
    };
}

impl ParametersBuilder {
    setters! {
        input_dimensions: Vec<usize>,
        column_dimensions: Vec<usize>,
        cells_per_column: usize,
        potential_radius: usize,
        potential_pct: Real,
        wrap_around: bool,
        global_inhibition: bool,
        local_area_density: Real,
        num_active_columns_per_inh_area: Real,
        stimulus_threshold: Real,
        syn_perm_inactive_dec: Permanence,
        syn_perm_active_inc: Permanence,
        syn_perm_connected: Permanence,
        syn_perm_below_stimulus_inc: Permanence,
        syn_perm_trim_threshold: Permanence,
        init_connected_pct: Real,
        min_pct_overlap_duty_cycles: Real,
        min_pct_active_duty_cycles: Real,
        duty_cycle_period: usize,
        max_boost: Real,
        update_period: usize,
        activation_threshold: usize,
        min_threshold: usize,
        max_new_synapse_count: usize,
        initial_permanence: Permanence,
        connected_permanence: Permanence,
        permanence_increment: Permanence,
        permanence_decrement: Permanence,
        seed: i64,
        sp_verbosity: u32,
        tm_verbosity: u32,
    }

    /// Validates and returns the parameters.
    pub fn build(self) -> Result<Parameters> {
        self.params.validate()?;
        Ok(self.params)
    }
}
