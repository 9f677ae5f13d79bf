//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::services::{
    CheckpointWriter, OptimizerService, OutputPaths, StopSignal, TreeLoader,
};
use crate::config::Settings;
use crate::domain::WeightedObjective;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    pub fn loader(&self) -> TreeLoader {
        TreeLoader::new(self.fs.clone(), self.settings.objective.unmatched_leaves)
    }

    pub fn checkpoint_writer(&self) -> CheckpointWriter {
        CheckpointWriter::new(
            self.fs.clone(),
            OutputPaths::from_config(&self.settings.output),
        )
    }

    pub fn optimizer(&self, stop: StopSignal) -> OptimizerService<WeightedObjective> {
        OptimizerService::new(
            self.settings.optimizer.clone(),
            self.settings.objective.weighted(),
        )
        .with_stop_signal(stop)
    }

    /// Random source for a run: seeded when configured, from the OS otherwise.
    pub fn rng(&self) -> StdRng {
        match self.settings.optimizer.seed {
            Some(seed) => {
                debug!("using seed {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        }
    }
}
