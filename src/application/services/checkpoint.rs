//! Checkpoint writing
//!
//! Improvements are written to two slot files in turn, so an interruption in
//! the middle of a write still leaves the other slot holding the previous
//! complete document. The canonical file is written before and after a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::config::OutputConfig;
use crate::domain::{render_document, TreeCollection};
use crate::infrastructure::traits::FileSystem;

/// One of the two alternating checkpoint files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    /// The other slot.
    pub fn toggled(self) -> Self {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

/// Where a checkpoint goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointTarget {
    /// As-loaded state before the search, best state after it
    Canonical,
    Slot(Slot),
}

/// Receiver of checkpoints emitted by the optimizer.
pub trait CheckpointSink {
    fn write(&mut self, target: CheckpointTarget, trees: &TreeCollection) -> ApplicationResult<()>;
}

/// Resolved checkpoint file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub canonical: PathBuf,
    pub slot_one: PathBuf,
    pub slot_two: PathBuf,
}

impl OutputPaths {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            canonical: output.dir.join(&output.canonical),
            slot_one: output.dir.join(&output.slot_one),
            slot_two: output.dir.join(&output.slot_two),
        }
    }

    pub fn path(&self, target: CheckpointTarget) -> &Path {
        match target {
            CheckpointTarget::Canonical => &self.canonical,
            CheckpointTarget::Slot(Slot::One) => &self.slot_one,
            CheckpointTarget::Slot(Slot::Two) => &self.slot_two,
        }
    }
}

/// Writes checkpoint documents to the filesystem.
pub struct CheckpointWriter {
    fs: Arc<dyn FileSystem>,
    paths: OutputPaths,
}

impl CheckpointWriter {
    pub fn new(fs: Arc<dyn FileSystem>, paths: OutputPaths) -> Self {
        Self { fs, paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }
}

impl CheckpointSink for CheckpointWriter {
    #[instrument(level = "debug", skip(self, trees))]
    fn write(&mut self, target: CheckpointTarget, trees: &TreeCollection) -> ApplicationResult<()> {
        let path = self.paths.path(target);
        self.fs
            .ensure_parent(path)
            .with_path_context("create output directory", path)?;
        self.fs
            .write(path, &render_document(trees))
            .with_path_context("write checkpoint", path)?;
        debug!("checkpoint written: {}", path.display());
        Ok(())
    }
}
