//! Tangle cost metrics over leaf orderings.
//!
//! Pairwise metrics rank the labels of `a` by their position in `b`. Labels of
//! `a` with no position in `b` are skipped: such a position contributes
//! nothing. Use [`TreeCollection::check_shared_leaves`] up front when that
//! situation must be an error instead.
//!
//! [`TreeCollection::check_shared_leaves`]: crate::domain::TreeCollection::check_shared_leaves

use std::collections::HashMap;

use itertools::Itertools;
use rayon::prelude::*;

use crate::domain::collection::TreeCollection;

/// Position of every label in `order`. A repeated label keeps its last position.
pub fn rank_of<'a>(order: &[&'a str]) -> HashMap<&'a str, usize> {
    order.iter().enumerate().map(|(i, &label)| (label, i)).collect()
}

/// Number of adjacent pairs of `a` that step backwards in `b`'s order, i.e.
/// positions `i` with `rank_b(a[i]) < rank_b(a[i-1])`.
pub fn crossing_count(a: &[&str], b: &[&str]) -> usize {
    crossing_count_ranked(a, b.len(), &rank_of(b))
}

fn crossing_count_ranked(a: &[&str], b_len: usize, rank: &HashMap<&str, usize>) -> usize {
    (1..a.len().min(b_len))
        .filter(|&i| match (rank.get(a[i]), rank.get(a[i - 1])) {
            (Some(current), Some(previous)) => current < previous,
            _ => false,
        })
        .count()
}

/// Sum of `|i - rank_b(a[i])|`: how far each leaf has to travel between the
/// two orderings.
pub fn flatness_count(a: &[&str], b: &[&str]) -> usize {
    flatness_count_ranked(a, b.len(), &rank_of(b))
}

fn flatness_count_ranked(a: &[&str], b_len: usize, rank: &HashMap<&str, usize>) -> usize {
    a.iter()
        .take(b_len)
        .enumerate()
        .filter_map(|(i, label)| rank.get(label).map(|&r| i.abs_diff(r)))
        .sum()
}

/// Number of positions `1..len-1` where a label sorts before its predecessor.
/// The last position is never inspected.
pub fn alpha_count(a: &[&str]) -> usize {
    (1..a.len().saturating_sub(1))
        .filter(|&i| a[i] < a[i - 1])
        .count()
}

/// Crossing and flatness for one pair, sharing a single rank table.
fn pair_counts(a: &[&str], b: &[&str]) -> (usize, usize) {
    let rank = rank_of(b);
    (
        crossing_count_ranked(a, b.len(), &rank),
        flatness_count_ranked(a, b.len(), &rank),
    )
}

fn pairs<'o, 'a>(orders: &'o [Vec<&'a str>]) -> Vec<(&'o Vec<&'a str>, &'o Vec<&'a str>)> {
    orders.iter().tuple_combinations().collect()
}

/// Sum of [`crossing_count`] over every unordered pair, earlier tree first.
pub fn crossing_count_all(orders: &[Vec<&str>]) -> usize {
    pairs(orders)
        .par_iter()
        .map(|(a, b)| crossing_count(a, b))
        .sum()
}

/// Sum of [`flatness_count`] over every unordered pair, earlier tree first.
pub fn flatness_count_all(orders: &[Vec<&str>]) -> usize {
    pairs(orders)
        .par_iter()
        .map(|(a, b)| flatness_count(a, b))
        .sum()
}

/// Sum of [`alpha_count`] over every ordering.
pub fn alpha_count_all(orders: &[Vec<&str>]) -> usize {
    orders.par_iter().map(|order| alpha_count(order)).sum()
}

/// Unweighted metric totals for one configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub crossings: usize,
    pub flatness: usize,
    pub alpha: usize,
}

impl ScoreBreakdown {
    pub fn of(orders: &[Vec<&str>]) -> Self {
        let (crossings, flatness) = pairs(orders)
            .par_iter()
            .map(|(a, b)| pair_counts(a, b))
            .reduce(|| (0, 0), |x, y| (x.0 + y.0, x.1 + y.1));
        Self {
            crossings,
            flatness,
            alpha: alpha_count_all(orders),
        }
    }

    pub fn of_trees(trees: &TreeCollection) -> Self {
        Self::of(&trees.leaf_orders())
    }
}

/// Value the optimizer minimizes.
pub trait Objective: Send + Sync {
    fn evaluate(&self, orders: &[Vec<&str>]) -> f64;

    /// Evaluate against the live rotations of `trees`.
    fn score(&self, trees: &TreeCollection) -> f64 {
        self.evaluate(&trees.leaf_orders())
    }
}

/// `flatness * Wf + crossings * Wc + alpha * Wa`. A zero weight drops its term
/// without computing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedObjective {
    pub flatness: f64,
    pub crossing: f64,
    pub alpha: f64,
}

impl Default for WeightedObjective {
    fn default() -> Self {
        Self {
            flatness: 1.0,
            crossing: 1.0,
            alpha: 0.5,
        }
    }
}

impl WeightedObjective {
    pub fn new(flatness: f64, crossing: f64, alpha: f64) -> Self {
        Self {
            flatness,
            crossing,
            alpha,
        }
    }

    pub fn combine(&self, score: &ScoreBreakdown) -> f64 {
        score.flatness as f64 * self.flatness
            + score.crossings as f64 * self.crossing
            + score.alpha as f64 * self.alpha
    }
}

impl Objective for WeightedObjective {
    fn evaluate(&self, orders: &[Vec<&str>]) -> f64 {
        let score = match (self.flatness != 0.0, self.crossing != 0.0) {
            (true, true) => ScoreBreakdown::of(orders),
            (false, true) => ScoreBreakdown {
                crossings: crossing_count_all(orders),
                ..ScoreBreakdown::default()
            },
            (true, false) => ScoreBreakdown {
                flatness: flatness_count_all(orders),
                ..ScoreBreakdown::default()
            },
            (false, false) => ScoreBreakdown::default(),
        };
        let alpha = if self.alpha != 0.0 {
            alpha_count_all(orders)
        } else {
            0
        };
        self.combine(&ScoreBreakdown { alpha, ..score })
    }
}
