//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CheckpointSink)
//! but are themselves concrete structs, not traits.

mod checkpoint;
mod loader;
mod optimizer;

pub use checkpoint::{CheckpointSink, CheckpointTarget, CheckpointWriter, OutputPaths, Slot};
pub use loader::TreeLoader;
pub use optimizer::{
    OptimizeOutcome, OptimizerService, OptimizerState, StopReason, StopSignal,
};
