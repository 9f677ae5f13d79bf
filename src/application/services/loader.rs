//! Tree loading service
//!
//! Reads tree documents from disk into a [`TreeCollection`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::UnmatchedLeafPolicy;
use crate::domain::{DomainError, Tree, TreeCollection, TreeReader};
use crate::infrastructure::traits::FileSystem;

/// Service turning input files into the collection the optimizer works on.
pub struct TreeLoader {
    fs: Arc<dyn FileSystem>,
    reader: TreeReader,
    policy: UnmatchedLeafPolicy,
}

impl TreeLoader {
    pub fn new(fs: Arc<dyn FileSystem>, policy: UnmatchedLeafPolicy) -> Self {
        Self {
            fs,
            reader: TreeReader::new(),
            policy,
        }
    }

    /// Load every tree record of every file, in file order then record order.
    ///
    /// The first tree loaded becomes the anchor. Fails on unreadable or
    /// malformed files, duplicate tree names, an empty result, and, under the
    /// strict policy, tree pairs that do not share their leaves.
    #[instrument(skip(self))]
    pub fn load(&self, paths: &[PathBuf]) -> ApplicationResult<TreeCollection> {
        let mut trees = TreeCollection::new();
        for path in paths {
            self.load_file(path, &mut trees)?;
        }

        if trees.is_empty() {
            return Err(DomainError::NoTrees.into());
        }
        if self.policy == UnmatchedLeafPolicy::Strict {
            trees.check_shared_leaves()?;
        }

        info!("loaded {} trees from {} files", trees.len(), paths.len());
        Ok(trees)
    }

    fn load_file(&self, path: &Path, trees: &mut TreeCollection) -> ApplicationResult<()> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::InputNotFound(path.to_path_buf()));
        }
        let text = self.fs.read_to_string(path).with_input_context(path)?;
        let records = self
            .reader
            .parse_document(&text)
            .map_err(|source| ApplicationError::InvalidInput {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("{}: {} tree records", path.display(), records.len());

        for record in records {
            trees
                .insert(Tree::new(record.name, &record.topology))
                .map_err(|source| ApplicationError::InvalidInput {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }
}
