//! HTM algorithms implementation.
//!
//! - **Connections**: the shared state both algorithms read and mutate
//! - **Spatial Pooler**: turns binary input into a sparse set of active columns
//! - **Temporal Memory**: learns sequences of column activations

mod compute_cycle;
mod connections;
mod pool;
mod spatial_pooler;
mod temporal_memory;

pub use compute_cycle::ComputeCycle;
pub use connections::{Connections, SegmentData, SegmentOwner, SynapseData};
pub use pool::Pool;
pub use spatial_pooler::SpatialPooler;
pub use temporal_memory::TemporalMemory;
