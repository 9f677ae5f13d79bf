//! Tests for checkpoint files written during a run
//!
//! The dual-slot scheme guarantees that after any write at least one slot
//! holds a complete document, and the canonical file ends up with the best
//! state found.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use detangle::application::services::{
    CheckpointSink, CheckpointTarget, CheckpointWriter, OptimizerService, OutputPaths,
};
use detangle::application::ApplicationResult;
use detangle::config::{OptimizerConfig, OutputConfig};
use detangle::domain::{
    Objective, Topology as T, Tree, TreeCollection, TreeReader, WeightedObjective,
};
use detangle::infrastructure::traits::{FileSystem, RealFileSystem};

fn tangled() -> TreeCollection {
    let mut trees = TreeCollection::new();
    let left = T::group([
        T::leaf("A"),
        T::group([T::leaf("B"), T::group([T::leaf("C"), T::leaf("D")])]),
    ]);
    let right = T::group([
        T::leaf("D"),
        T::group([T::leaf("C"), T::group([T::leaf("B"), T::leaf("A")])]),
    ]);
    trees.insert(Tree::new("left", &left)).unwrap();
    trees.insert(Tree::new("right", &right)).unwrap();
    trees
}

fn config() -> OptimizerConfig {
    OptimizerConfig {
        starting_intensity: 3,
        plateau_before_cooling: 5,
        plateau_before_stop: 20,
        max_count: 200,
        ..OptimizerConfig::default()
    }
}

fn paths_in(dir: &Path) -> OutputPaths {
    OutputPaths::from_config(&OutputConfig {
        dir: dir.to_path_buf(),
        ..OutputConfig::default()
    })
}

/// Parse a checkpoint file back into a scored collection; `None` when the
/// file is missing, truncated or malformed.
fn reload(path: &Path) -> Option<f64> {
    let text = std::fs::read_to_string(path).ok()?;
    if !text.ends_with("end;\n") {
        return None;
    }
    let records = TreeReader::new().parse_document(&text).ok()?;
    let mut trees = TreeCollection::new();
    for record in records {
        trees.insert(Tree::new(record.name, &record.topology)).ok()?;
    }
    Some(WeightedObjective::default().score(&trees))
}

/// Checks the slot files after every slot write.
struct Inspecting {
    inner: CheckpointWriter,
    scores: Vec<f64>,
}

impl CheckpointSink for Inspecting {
    fn write(&mut self, target: CheckpointTarget, trees: &TreeCollection) -> ApplicationResult<()> {
        self.inner.write(target, trees)?;
        if let CheckpointTarget::Slot(slot) = target {
            let paths = self.inner.paths();
            let written = reload(paths.path(target)).expect("slot just written parses");
            self.scores.push(written);
            if self.scores.len() > 1 {
                let other = reload(paths.path(CheckpointTarget::Slot(slot.toggled())))
                    .expect("other slot keeps a complete document");
                assert!(other > written);
            }
        }
        Ok(())
    }
}

/// Leaves a truncated file behind and fails for every path ending in `suffix`.
struct TruncatingFileSystem {
    suffix: &'static str,
}

impl FileSystem for TruncatingFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if path.to_string_lossy().ends_with(self.suffix) {
            RealFileSystem.write(path, &content[..content.len() / 2])?;
            return Err(io::Error::other("device full"));
        }
        RealFileSystem.write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        RealFileSystem.is_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.create_dir_all(path)
    }
}

#[test]
fn given_run_when_slots_written_then_other_slot_always_holds_previous_best() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let mut sink = Inspecting {
        inner: CheckpointWriter::new(Arc::new(RealFileSystem), paths_in(temp.path())),
        scores: Vec::new(),
    };
    let mut trees = tangled();

    // Act
    let outcome = OptimizerService::new(config(), WeightedObjective::default()).run(
        &mut trees,
        &mut StdRng::seed_from_u64(21),
        &mut sink,
    );

    // Assert
    assert_eq!(sink.scores.len(), outcome.improvements);
    assert!(sink.scores.windows(2).all(|w| w[1] < w[0]));
    let canonical = reload(&temp.path().join("result.dat")).expect("canonical parses");
    assert_eq!(canonical, outcome.best);
}

#[test]
fn given_failing_second_slot_when_running_then_first_slot_keeps_last_good_state() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let fs = Arc::new(TruncatingFileSystem {
        suffix: "result2.dat",
    });
    let mut writer = CheckpointWriter::new(fs, paths_in(temp.path()));
    let mut trees = tangled();

    // Act
    let outcome = OptimizerService::new(config(), WeightedObjective::default()).run(
        &mut trees,
        &mut StdRng::seed_from_u64(21),
        &mut writer,
    );

    // Assert
    assert!(outcome.improvements >= 1);
    assert_eq!(outcome.failed_writes, outcome.improvements - 1);
    let slot_one = reload(&temp.path().join("result1.dat"));
    assert!(slot_one.is_some_and(|score| score < outcome.initial));
    if outcome.improvements > 1 {
        assert!(reload(&temp.path().join("result2.dat")).is_none());
    }
    assert_eq!(reload(&temp.path().join("result.dat")), Some(outcome.best));
}

#[test]
fn given_unwritable_output_dir_when_running_then_search_still_completes() {
    // Arrange: the output "directory" is a regular file
    let temp = TempDir::new().unwrap();
    let blocker: PathBuf = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let mut writer = CheckpointWriter::new(Arc::new(RealFileSystem), paths_in(&blocker));
    let mut trees = tangled();

    // Act
    let outcome = OptimizerService::new(config(), WeightedObjective::default()).run(
        &mut trees,
        &mut StdRng::seed_from_u64(2),
        &mut writer,
    );

    // Assert
    assert!(!outcome.final_written);
    assert_eq!(outcome.failed_writes, outcome.improvements + 2);
    assert!(outcome.best <= outcome.initial);
}
