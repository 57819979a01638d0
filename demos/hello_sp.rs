//! Spatial pooler and temporal memory on random inputs.
//!
//! Feeds a handful of random binary vectors through the spatial pooler, hands
//! the active columns to the temporal memory, and prints what each step
//! produced. Set `RUST_LOG=debug` to see the per-step logs as well.
//!
//! Run with: cargo run --example hello_sp

use cortexa::prelude::*;

const INPUT_SIZE: usize = 1000;
const NUM_COLUMNS: usize = 2048;
const NUM_PATTERNS: usize = 5;
const REPETITIONS: usize = 3;

fn main() -> Result<()> {
    env_logger::init();

    let params = Parameters::builder()
        .input_dimensions(vec![INPUT_SIZE])
        .column_dimensions(vec![NUM_COLUMNS])
        .cells_per_column(8)
        .potential_radius(INPUT_SIZE / 2)
        .global_inhibition(true)
        .local_area_density(0.02)
        .sp_verbosity(1)
        .tm_verbosity(1)
        .build()?;

    let mut connections = Connections::new(params)?;
    let sp = SpatialPooler::new();
    let tm = TemporalMemory::new();
    sp.init(&mut connections)?;

    let mut rng = Random::new(7);
    let patterns: Vec<Vec<u8>> = (0..NUM_PATTERNS)
        .map(|_| (0..INPUT_SIZE).map(|_| u8::from(rng.get_bool_with_prob(0.1))).collect())
        .collect();

    println!("=== hello_sp: {} inputs -> {} columns ===\n", INPUT_SIZE, NUM_COLUMNS);

    let mut active = vec![0u8; NUM_COLUMNS];
    for rep in 0..REPETITIONS {
        tm.reset(&mut connections);
        println!("-- pass {} --", rep + 1);

        for (i, input) in patterns.iter().enumerate() {
            let columns = sp.compute(&mut connections, input, &mut active, true, true)?;
            let cycle = tm.compute(&mut connections, &columns, true)?;

            let preview: Vec<String> = columns.iter().take(8).map(ToString::to_string).collect();
            println!(
                "pattern {}: {:>3} columns [{}...], {:>3} predicted, {:>4} active cells, {:>3} predictive",
                i,
                columns.len(),
                preview.join(", "),
                cycle.predicted_columns().len(),
                cycle.active_cells().len(),
                cycle.predictive_cells().len()
            );
        }
        println!();
    }

    println!(
        "{} segments, {} synapses after {} steps",
        connections.num_segments(),
        connections.num_synapses(),
        connections.iteration_num()
    );
    Ok(())
}
