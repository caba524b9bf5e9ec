//! State module for resumable harvesting
//!
//! # Components
//!
//! - `Checkpoint` / `CheckpointStore`: durable cursor (high-water id, cumulative total)
//! - `DedupStore`: fingerprints of every post persisted so far

mod checkpoint;
mod dedup;

// Re-export main types
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use dedup::DedupStore;
