//! Randomized coordinate-descent over twist vectors.
//!
//! Each pass visits the trees in collection order. For one tree, a proposal is
//! built by bumping `intensity` randomly chosen twist positions by one; it is
//! kept only if the global objective strictly improves. Runs of rejected
//! proposals shrink the intensity until the search settles at zero.
//! No worse solution is ever accepted, so the tracked best never increases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info, instrument, Level};

use crate::application::services::checkpoint::{CheckpointSink, CheckpointTarget, Slot};
use crate::config::OptimizerConfig;
use crate::domain::{crossing_count_all, Objective, TreeCollection, TwistVector};

/// Shared flag asking a running search to stop after the current step.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Intensity cooled down to zero
    Cooled,
    /// The pass limit was exceeded
    MaxCount,
    /// A stop was requested through the [`StopSignal`]
    Interrupted,
}

/// Mutable search state of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerState {
    pub best: f64,
    pub intensity: usize,
    pub steps_since_improvement: usize,
    /// Slot receiving the next improvement checkpoint
    pub slot: Slot,
    /// 1-based number of the current pass
    pub count: usize,
    /// Accepted twist vector per tree, in collection order
    pub twists: Vec<TwistVector>,
    pub improvements: usize,
    pub failed_writes: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    pub initial: f64,
    pub best: f64,
    pub completed_passes: usize,
    pub improvements: usize,
    pub final_intensity: usize,
    pub stop_reason: StopReason,
    pub failed_writes: usize,
    /// Whether the closing canonical checkpoint reached its destination
    pub final_written: bool,
}

/// Drives the search over a [`TreeCollection`].
pub struct OptimizerService<O: Objective> {
    config: OptimizerConfig,
    objective: O,
    stop: StopSignal,
}

impl<O: Objective> OptimizerService<O> {
    pub fn new(config: OptimizerConfig, objective: O) -> Self {
        Self {
            config,
            objective,
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    /// State before the first pass, scored against the live rotations.
    pub fn initial_state(&self, trees: &TreeCollection) -> OptimizerState {
        OptimizerState {
            best: self.objective.score(trees),
            intensity: self.config.starting_intensity,
            steps_since_improvement: 0,
            slot: Slot::One,
            count: 1,
            twists: trees.twists(),
            improvements: 0,
            failed_writes: 0,
        }
    }

    /// Run to completion or until stopped.
    ///
    /// The canonical checkpoint is written before the first pass and again on
    /// the way out, whatever ended the run. On return the live rotations of
    /// `trees` hold the best configuration found.
    #[instrument(skip_all, fields(trees = trees.len()))]
    pub fn run<R: Rng + ?Sized>(
        &self,
        trees: &mut TreeCollection,
        rng: &mut R,
        sink: &mut dyn CheckpointSink,
    ) -> OptimizeOutcome {
        let mut state = self.initial_state(trees);
        let initial = state.best;
        info!(
            "starting search: objective {}, intensity {}",
            initial, state.intensity
        );
        self.checkpoint(CheckpointTarget::Canonical, trees, sink, &mut state);

        let stop_reason = loop {
            if state.intensity == 0 {
                break StopReason::Cooled;
            }
            if state.count > self.config.max_count {
                break StopReason::MaxCount;
            }
            if tracing::enabled!(Level::DEBUG) {
                debug!(
                    "pass {}, intensity {}, objective {}, crossings {}",
                    state.count,
                    state.intensity,
                    state.best,
                    crossing_count_all(&trees.leaf_orders())
                );
            }
            if let Some(reason) = self.pass(&mut state, trees, rng, sink) {
                break reason;
            }
            state.count += 1;
        };

        let final_written = self.checkpoint(CheckpointTarget::Canonical, trees, sink, &mut state);
        info!(
            "search ended ({:?}) after {} passes: objective {} -> {}",
            stop_reason,
            state.count - 1,
            initial,
            state.best
        );

        OptimizeOutcome {
            initial,
            best: state.best,
            completed_passes: state.count - 1,
            improvements: state.improvements,
            final_intensity: state.intensity,
            stop_reason,
            failed_writes: state.failed_writes,
            final_written,
        }
    }

    /// One pass over all trees. Returns `Some` when a stop was requested.
    pub fn pass<R: Rng + ?Sized>(
        &self,
        state: &mut OptimizerState,
        trees: &mut TreeCollection,
        rng: &mut R,
        sink: &mut dyn CheckpointSink,
    ) -> Option<StopReason> {
        for index in 0..trees.len() {
            if self.stop.is_requested() {
                return Some(StopReason::Interrupted);
            }
            if state.intensity == 0 {
                break;
            }
            if self.config.skip_first_tree && index == 0 {
                continue;
            }
            self.step(index, state, trees, rng, sink);
            self.cool(state);
        }
        None
    }

    /// Propose, evaluate and accept or roll back a perturbation of one tree.
    /// Returns whether the proposal was accepted.
    pub fn step<R: Rng + ?Sized>(
        &self,
        index: usize,
        state: &mut OptimizerState,
        trees: &mut TreeCollection,
        rng: &mut R,
        sink: &mut dyn CheckpointSink,
    ) -> bool {
        let original = state.twists[index].clone();
        let mut proposal = original.clone();
        if !proposal.is_empty() {
            for _ in 0..state.intensity {
                let position = rng.random_range(0..proposal.len());
                proposal[position] += 1;
            }
        }

        let Some(tree) = trees.get_index_mut(index) else {
            return false;
        };
        tree.apply_twists(&proposal);
        let candidate = self.objective.score(trees);

        if candidate < state.best {
            debug!(
                "tree {} improved objective {} -> {}",
                index, state.best, candidate
            );
            state.twists[index] = proposal;
            state.best = candidate;
            state.steps_since_improvement = 0;
            state.improvements += 1;
            let slot = state.slot;
            if self.checkpoint(CheckpointTarget::Slot(slot), trees, sink, state) {
                debug!("checkpoint slot {} written", slot.number());
                state.slot = slot.toggled();
            }
            true
        } else {
            if let Some(tree) = trees.get_index_mut(index) {
                tree.apply_twists(&original);
            }
            state.steps_since_improvement += 1;
            false
        }
    }

    /// Shrink the intensity after a plateau; stop after a long one at 1.
    pub fn cool(&self, state: &mut OptimizerState) {
        if state.steps_since_improvement > self.config.plateau_before_cooling && state.intensity > 1 {
            state.intensity =
                (state.intensity as f64 * self.config.intensity_reduction).floor() as usize;
            state.steps_since_improvement = 0;
            debug!("cooling: intensity {}", state.intensity);
        }
        if state.steps_since_improvement > self.config.plateau_before_stop && state.intensity == 1 {
            state.intensity = 0;
            debug!("no improvement at intensity 1, stopping");
        }
    }

    /// Write a checkpoint; failures are logged and counted, never fatal.
    fn checkpoint(
        &self,
        target: CheckpointTarget,
        trees: &TreeCollection,
        sink: &mut dyn CheckpointSink,
        state: &mut OptimizerState,
    ) -> bool {
        match sink.write(target, trees) {
            Ok(()) => true,
            Err(e) => {
                error!("checkpoint {:?} failed: {}", target, e);
                state.failed_writes += 1;
                false
            }
        }
    }
}
