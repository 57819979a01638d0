//! Property tests for the invariants the substrate and both algorithms rely on.
//!
//! Run with: `cargo test --test invariants`

use cortexa::prelude::*;
use cortexa::types::{clamp_permanence, MAX_PERMANENCE, MIN_PERMANENCE};
use proptest::prelude::*;
use std::collections::HashSet;

fn dims_strategy() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..6, 1..5)
}

// =============================================================================
// INDEX ADDRESSING
// =============================================================================

mod addressing {
    use super::*;

    #[test]
    fn test_row_major_known_values() {
        let shape = MatrixShape::new(&[3, 4, 5]).unwrap();
        assert_eq!(shape.multiples(), &[20, 5, 1]);
        assert_eq!(shape.compute_index(&[2, 3, 4]).unwrap(), 59);
        assert_eq!(shape.compute_coordinates(59).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn test_column_major_known_values() {
        let shape = MatrixShape::column_major(&[3, 4, 5]).unwrap();
        assert_eq!(shape.multiples(), &[1, 3, 12]);
        assert_eq!(shape.compute_index(&[2, 3, 4]).unwrap(), 59);
        assert_eq!(shape.compute_index(&[1, 0, 0]).unwrap(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_index_round_trips(dims in dims_strategy(), column_major in any::<bool>(), seed in any::<usize>()) {
            let shape = MatrixShape::with_ordering(&dims, column_major).unwrap();
            let index = seed % shape.size();

            let coords = shape.compute_coordinates(index).unwrap();
            prop_assert_eq!(coords.len(), dims.len());
            for (c, d) in coords.iter().zip(&dims) {
                prop_assert!(c < d);
            }
            prop_assert_eq!(shape.compute_index(&coords).unwrap(), index);
        }

        #[test]
        fn prop_indices_are_a_bijection(dims in dims_strategy(), column_major in any::<bool>()) {
            let shape = MatrixShape::with_ordering(&dims, column_major).unwrap();
            let seen: HashSet<Vec<usize>> = (0..shape.size())
                .map(|i| shape.compute_coordinates(i).unwrap())
                .collect();
            prop_assert_eq!(seen.len(), shape.size());
        }

        #[test]
        fn prop_out_of_range_rejected(dims in dims_strategy()) {
            let shape = MatrixShape::new(&dims).unwrap();
            prop_assert!(shape.compute_coordinates(shape.size()).is_err());

            let mut coords = vec![0; dims.len()];
            coords[0] = dims[0];
            prop_assert!(shape.compute_index(&coords).is_err());
        }
    }
}

// =============================================================================
// SPARSE MATRICES
// =============================================================================

mod sparse_matrices {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_true_counts_track_rows(
            writes in proptest::collection::vec((0usize..8, 0usize..16, any::<bool>()), 0..80)
        ) {
            let mut m = SparseBinaryMatrix::with_true_counts(&[8, 16]).unwrap();
            for (r, col, v) in writes {
                m.set(&[r, col], v).unwrap();
            }
            for r in 0..8 {
                prop_assert_eq!(m.true_count(r).unwrap(), m.row_sparse(r).unwrap().len());
            }
            prop_assert_eq!(m.true_counts().iter().sum::<usize>(), m.sparse_indices().len());
        }

        #[test]
        fn prop_overlap_matches_naive_dot_product(
            bits in proptest::collection::vec(any::<bool>(), 6 * 20),
            input in proptest::collection::vec(0u8..2, 20)
        ) {
            let mut m = SparseBinaryMatrix::new(&[6, 20]).unwrap();
            for (i, &b) in bits.iter().enumerate() {
                m.set_index(i, b).unwrap();
            }
            let sums = m.right_vec_sum_at_nz(&input).unwrap();
            for r in 0..6 {
                let expected = (0..20).filter(|&c| bits[r * 20 + c] && input[c] == 1).count();
                prop_assert_eq!(sums[r] as usize, expected);
            }
        }

        #[test]
        fn prop_object_matrix_stores_sparse_indices(
            writes in proptest::collection::vec((0usize..100, any::<i32>()), 0..40)
        ) {
            let mut m = SparseObjectMatrix::new(&[10, 10]).unwrap();
            let mut expected = std::collections::BTreeMap::new();
            for (i, v) in writes {
                m.set_index(i, v).unwrap();
                expected.insert(i, v);
            }
            prop_assert_eq!(m.sparse_indices(), expected.keys().copied().collect::<Vec<_>>());
            for (i, v) in &expected {
                prop_assert_eq!(m.get_index(*i), Some(v));
            }
        }
    }
}

// =============================================================================
// PERMANENCES
// =============================================================================

mod permanences {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn prop_clamp_stays_in_range(p in -10.0f64..10.0) {
            let clamped = clamp_permanence(p);
            prop_assert!((MIN_PERMANENCE..=MAX_PERMANENCE).contains(&clamped));
            if (MIN_PERMANENCE..=MAX_PERMANENCE).contains(&p) {
                prop_assert_eq!(clamped, p);
            }
        }

        #[test]
        fn prop_synapse_permanences_are_clamped(
            initial in -2.0f64..2.0,
            updates in proptest::collection::vec(-2.0f64..2.0, 0..10)
        ) {
            let params = Parameters::builder()
                .input_dimensions(vec![8])
                .column_dimensions(vec![4])
                .cells_per_column(2)
                .build()
                .unwrap();
            let mut c = Connections::new(params).unwrap();
            let segment = c.create_segment(0, 0).unwrap();
            let synapse = c.create_synapse(segment, 5, initial, 0).unwrap();
            prop_assert!((MIN_PERMANENCE..=MAX_PERMANENCE).contains(&c.permanence(synapse).unwrap()));

            for p in updates {
                c.set_permanence(synapse, p).unwrap();
                prop_assert_eq!(c.permanence(synapse).unwrap(), clamp_permanence(p));
            }
        }
    }
}

// =============================================================================
// TOPOLOGY
// =============================================================================

mod topology {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_neighbors_sorted_and_exclude_center(
            dims in proptest::collection::vec(1usize..8, 1..4),
            seed in any::<usize>(),
            radius in 0usize..4,
            wrap in any::<bool>()
        ) {
            let shape = MatrixShape::new(&dims).unwrap();
            let center = seed % shape.size();
            let neighbors = Topology::neighbors_nd(center, &shape, radius, WrappingMode::from(wrap)).unwrap();

            prop_assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!neighbors.contains(&center));
            prop_assert!(neighbors.iter().all(|&n| n < shape.size()));
        }

        #[test]
        fn prop_wrapping_only_adds_neighbors(
            dims in proptest::collection::vec(1usize..8, 1..4),
            seed in any::<usize>(),
            radius in 0usize..4
        ) {
            let shape = MatrixShape::new(&dims).unwrap();
            let center = seed % shape.size();
            let plain = Topology::neighbors_nd(center, &shape, radius, WrappingMode::NoWrap).unwrap();
            let wrapped: HashSet<usize> = Topology::neighbors_nd(center, &shape, radius, WrappingMode::Wrap)
                .unwrap()
                .into_iter()
                .collect();
            prop_assert!(plain.iter().all(|n| wrapped.contains(n)));
        }
    }
}

// =============================================================================
// ALGORITHMS
// =============================================================================

mod algorithms {
    use super::*;

    fn pooled(seed: i64) -> Connections {
        let params = Parameters::builder()
            .input_dimensions(vec![48])
            .column_dimensions(vec![64])
            .cells_per_column(4)
            .potential_radius(8)
            .global_inhibition(true)
            .local_area_density(0.1)
            .seed(seed)
            .build()
            .unwrap();
        let mut c = Connections::new(params).unwrap();
        SpatialPooler::new().init(&mut c).unwrap();
        c
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_pooler_is_deterministic_for_a_seed(
            seed in 0i64..i64::MAX,
            input in proptest::collection::vec(0u8..2, 48)
        ) {
            let sp = SpatialPooler::new();
            let mut a = pooled(seed);
            let mut b = pooled(seed);
            let mut out_a = vec![0u8; 64];
            let mut out_b = vec![0u8; 64];

            let first = sp.compute(&mut a, &input, &mut out_a, false, false).unwrap();
            let second = sp.compute(&mut b, &input, &mut out_b, false, false).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(out_a, out_b);

            let mut out = vec![0u8; 64];
            let again = sp.compute(&mut a, &input, &mut out, false, false).unwrap();
            prop_assert_eq!(first, again);
        }

        #[test]
        fn prop_pooler_output_is_sparse(
            seed in 0i64..i64::MAX,
            input in proptest::collection::vec(0u8..2, 48)
        ) {
            let sp = SpatialPooler::new();
            let mut c = pooled(seed);
            let mut out = vec![0u8; 64];
            let active = sp.compute(&mut c, &input, &mut out, true, true).unwrap();

            prop_assert!(active.len() <= 7);
            prop_assert!(active.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(out.iter().filter(|&&b| b == 1).count(), active.len());
        }

        #[test]
        fn prop_cycle_sets_are_consistent(
            steps in proptest::collection::vec(proptest::collection::vec(0usize..64, 1..8), 1..6)
        ) {
            let tm = TemporalMemory::new();
            let mut c = pooled(7);

            for columns in steps {
                let prev_predictive = c.predictive_cells().clone();
                let cycle = tm.compute(&mut c, &columns, true).unwrap();

                prop_assert!(cycle.winner_cells().iter().all(|cell| cycle.active_cells().contains(cell)));
                prop_assert!(cycle.active_cells().iter().all(|&cell| columns.contains(&c.column_for_cell(cell))));
                prop_assert!(cycle.predicted_columns().iter().all(|col| columns.contains(col)));
                for col in cycle.predicted_columns() {
                    let predicted = c.cells_for_column(*col).any(|cell| prev_predictive.contains(&cell));
                    prop_assert!(predicted);
                }

                let distinct: HashSet<usize> = columns.iter().copied().collect();
                prop_assert!(cycle.winner_cells().len() >= distinct.len());
            }
        }
    }
}
