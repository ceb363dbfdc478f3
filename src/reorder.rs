//! Variable sifting for arena diagrams.
//!
//! # Theory: Variable Ordering
//!
//! The size of a decision diagram is highly sensitive to the variable order. For
//! `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)` the interleaved order (x₁, y₁, x₂, y₂, ...)
//! gives O(n) nodes, while (x₁, ..., xₙ, y₁, ..., yₙ) gives O(2ⁿ). Finding an optimal order
//! is NP-complete, so we improve an existing order by local search.
//!
//! # Sifting
//!
//! For each selected variable (most populated level first):
//! 1. Sweep it, one adjacent swap at a time, towards the nearer boundary of the sifting
//!    range, measuring the diagram after every swap
//! 2. Return to the start position
//! 3. Sweep it to the opposite boundary, measuring again
//! 4. Move it to the first position where the smallest size was seen
//!
//! The start position is a candidate too, so sifting never grows the diagram.
//!
//! # Adjacent swap
//!
//! Swapping levels `i` (variable x) and `i + 1` (variable y) rewrites every node `N` at
//! level `i` in place. With `A = N.high` and `B = N.low`, and `A1`/`A0` the cofactors of `A`
//! with respect to y (or `A` itself if it does not test y):
//!
//! ```text
//!        N: x                    N: y
//!       /    \                  /    \
//!      B      A      ==>     x:(B0,A0)  x:(B1,A1)
//! ```
//!
//! The two new x-nodes are shared with any equal node already created at level `i + 1`.
//! A node whose children both skip level `i + 1` does not depend on y and simply moves down.
//! Old y-nodes stay valid (now at level `i`) for any parent that still references them.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::reduce::Reduction;
use crate::reference::Ref;
use crate::types::{Level, Var};

/// Statistics collected during reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderStats {
    /// Number of variable swaps performed
    pub swaps: usize,
    /// Initial diagram size (number of nodes)
    pub initial_size: usize,
    /// Final diagram size after reordering
    pub final_size: usize,
    /// Best size seen during reordering
    pub best_size: usize,
    /// Number of variables sifted
    pub variables_processed: usize,
}

impl ReorderStats {
    /// Calculate the size reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    /// Calculate the percentage reduction.
    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }
}

/// In-place sifter with its own per-level node index.
///
/// The index is rebuilt on every measurement; between measurements it is kept in sync
/// by [`Sifter::swap_adjacent`] (it may then also contain orphaned nodes).
pub struct Sifter<'a> {
    bdd: &'a mut Bdd,
    levels: Vec<Vec<Ref>>,
    mode: Reduction,
    swaps: usize,
    best_size: usize,
}

impl<'a> Sifter<'a> {
    /// Level-synchronous diagrams are kept level-synchronous; anything else is kept fully reduced.
    pub fn new(bdd: &'a mut Bdd) -> Self {
        let mode = if bdd.is_level_synchronous() {
            Reduction::Quasi
        } else {
            Reduction::Full
        };
        let mut sifter = Self {
            bdd,
            levels: Vec::new(),
            mode,
            swaps: 0,
            best_size: usize::MAX,
        };
        sifter.measure();
        sifter
    }

    /// Drops orphans (and merges duplicates), rebuilds the level index and returns the size.
    pub fn measure(&mut self) -> usize {
        let size = self.bdd.reduce(self.mode);
        self.levels = self.bdd.nodes_by_level();
        self.best_size = self.best_size.min(size);
        size
    }

    pub fn swaps(&self) -> usize {
        self.swaps
    }

    /// Exchanges the variables at `level` and `level + 1`.
    pub fn swap_adjacent(&mut self, level: Level) {
        let i = level.index();
        if i + 1 >= self.bdd.num_vars() {
            return;
        }
        let x = self.bdd.var_at(level);
        let y = self.bdd.var_at(level.next());
        debug!("swap_adjacent({}: {} <-> {})", level, self.bdd.name(x), self.bdd.name(y));

        let upper = std::mem::take(&mut self.levels[i]);
        let lower = std::mem::take(&mut self.levels[i + 1]);
        self.bdd.swap_order(level);

        // x-nodes living at level i + 1 after the swap, by (low, high)
        let mut unique: HashMap<(Ref, Ref), Ref> = HashMap::new();
        let mut new_upper = Vec::with_capacity(upper.len() + lower.len());
        let mut new_lower = Vec::new();

        for r in upper {
            let node = *self.bdd.node(r);
            let high_tests_y = self.bdd.variable(node.high) == Some(y);
            let low_tests_y = self.bdd.variable(node.low) == Some(y);

            if !high_tests_y && !low_tests_y {
                unique.entry((node.low, node.high)).or_insert(r);
                new_lower.push(r);
                continue;
            }

            let (a1, a0) = self.cofactors(node.high, high_tests_y);
            let (b1, b0) = self.cofactors(node.low, low_tests_y);
            let new_one = Self::find_or_add(self.bdd, &mut unique, &mut new_lower, x, b1, a1);
            let new_zero = Self::find_or_add(self.bdd, &mut unique, &mut new_lower, x, b0, a0);

            let node = self.bdd.node_mut(r);
            node.variable = Some(y);
            node.high = new_one;
            node.low = new_zero;
            new_upper.push(r);
        }

        new_upper.extend(lower);
        self.levels[i] = new_upper;
        self.levels[i + 1] = new_lower;
        self.swaps += 1;
    }

    fn cofactors(&self, r: Ref, tests_y: bool) -> (Ref, Ref) {
        if tests_y {
            (self.bdd.high(r), self.bdd.low(r))
        } else {
            (r, r)
        }
    }

    fn find_or_add(
        bdd: &mut Bdd,
        unique: &mut HashMap<(Ref, Ref), Ref>,
        new_lower: &mut Vec<Ref>,
        x: Var,
        low: Ref,
        high: Ref,
    ) -> Ref {
        *unique.entry((low, high)).or_insert_with(|| {
            let r = bdd.mk_node(x, low, high);
            new_lower.push(r);
            r
        })
    }

    /// Moves the variable at level `from` to level `to` by adjacent swaps.
    fn move_var(&mut self, from: usize, to: usize) {
        let mut current = from;
        while current > to {
            self.swap_adjacent(Level::new(current - 1));
            current -= 1;
        }
        while current < to {
            self.swap_adjacent(Level::new(current));
            current += 1;
        }
    }

    /// Moves the variable from level `from` to level `to`, measuring after every swap and
    /// recording strict improvements in `best`. Returns the final level.
    fn sweep(&mut self, var: Var, from: usize, to: usize, best: &mut (usize, usize)) -> usize {
        let mut current = from;
        while current != to {
            if current > to {
                self.swap_adjacent(Level::new(current - 1));
                current -= 1;
            } else {
                self.swap_adjacent(Level::new(current));
                current += 1;
            }
            let size = self.measure();
            debug!("  {} at level {}: size = {}", self.bdd.name(var), current, size);
            if size < best.1 {
                *best = (current, size);
            }
        }
        current
    }

    /// Sifts `var` within levels `top..num_vars()` and leaves it at the first position
    /// where the smallest diagram was observed. Returns that size.
    pub fn find_optimal_var_position(&mut self, var: Var, top: Level) -> usize {
        let n = self.bdd.num_vars();
        let top = top.index();
        let start = self.bdd.level_of(var).index();
        let mut best = (start, self.measure());
        if n == 0 || start < top {
            return best.1;
        }
        let bottom = n - 1;

        let (near, far) = if start - top <= bottom - start {
            (top, bottom)
        } else {
            (bottom, top)
        };
        let current = self.sweep(var, start, near, &mut best);
        self.move_var(current, start);
        let current = self.sweep(var, start, far, &mut best);

        self.move_var(current, best.0);
        let size = self.measure();
        debug!(
            "find_optimal_var_position({}): level {} -> {}, size {}",
            self.bdd.name(var),
            start,
            best.0,
            size
        );
        size
    }

    /// Sifts the variables at levels `start..`, most populated level first,
    /// processing at most `limit` variables.
    pub fn sift(&mut self, start: Level, limit: Option<usize>) -> ReorderStats {
        let initial_size = self.bdd.size();
        let n = self.bdd.num_vars();
        let swaps_before = self.swaps;

        let mut candidates: Vec<(Var, usize)> = (start.index()..n)
            .map(|l| (self.bdd.var_at(Level::new(l)), self.levels[l].len()))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(limit) = limit {
            candidates.truncate(limit);
        }
        debug!(
            "Sifting {} variables from level {}, initial size {}",
            candidates.len(),
            start,
            initial_size
        );

        let mut final_size = initial_size;
        for &(var, _) in &candidates {
            final_size = self.find_optimal_var_position(var, start);
        }

        let stats = ReorderStats {
            swaps: self.swaps - swaps_before,
            initial_size,
            final_size,
            best_size: self.best_size,
            variables_processed: candidates.len(),
        };
        debug!(
            "Sifting complete: size {} -> {} ({:.1}% reduction), {} swaps",
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps
        );
        stats
    }
}

impl Bdd {
    /// Sifts the variables at levels `start..` in place (see [`Sifter::sift`]).
    ///
    /// The diagram is also reduced: quasi-reduced if it was level-synchronous, fully
    /// reduced otherwise.
    pub fn sift(&mut self, start: Level, limit: Option<usize>) -> ReorderStats {
        let initial_size = self.collect_garbage();
        let mut stats = Sifter::new(self).sift(start, limit);
        stats.initial_size = initial_size;
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use num_bigint::BigUint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::builder::{BddBuilder, BuilderKind};
    use crate::formula::tests::{assignments, random_formula};
    use crate::formula::Formula;
    use crate::parser::parse_formula;

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|s| s.to_string()).collect()
    }

    fn assert_equivalent(bdd: &Bdd, f: &Formula, all: &[HashMap<String, bool>]) {
        for assignment in all {
            assert_eq!(bdd.evaluate(assignment).unwrap(), f.eval(assignment).unwrap(), "{}", f);
        }
    }

    #[test]
    fn test_swap_preserves_function() {
        let vars = ["a", "b", "c", "d"];
        let all = assignments(&vars);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let f = random_formula(&mut rng, &vars, 5);
            for kind in [BuilderKind::QuasiReduced, BuilderKind::FullyReduced] {
                let mut bdd = BddBuilder::new(kind).build(&f, &names(&vars)).unwrap();
                let mut sifter = Sifter::new(&mut bdd);
                let size = sifter.measure();
                sifter.swap_adjacent(Level::new(1));
                sifter.measure();
                sifter.swap_adjacent(Level::new(0));
                sifter.swap_adjacent(Level::new(2));
                sifter.measure();
                sifter.swap_adjacent(Level::new(2));
                sifter.swap_adjacent(Level::new(0));
                sifter.swap_adjacent(Level::new(1));
                assert_eq!(sifter.measure(), size);
                drop(sifter);
                assert_eq!(bdd.order(), names(&vars));
                assert_equivalent(&bdd, &f, &all);
                if kind == BuilderKind::QuasiReduced {
                    assert!(bdd.is_level_synchronous());
                }
            }
        }
    }

    #[test]
    fn test_swap_single_level() {
        // a & b with the quasi diagram swapped to [b, a]
        let f = parse_formula("a & b").unwrap();
        let mut bdd = BddBuilder::default().build(&f, &names(&["a", "b"])).unwrap();
        let mut sifter = Sifter::new(&mut bdd);
        sifter.swap_adjacent(Level::new(0));
        assert_eq!(sifter.measure(), 2 + 3);
        assert_eq!(bdd.order(), vec!["b", "a"]);
        assert_eq!(bdd.sat_count(), BigUint::from(1u32));
    }

    #[test]
    fn test_sift_interleaves_pairs() {
        let f = parse_formula("a1 & b1 | a2 & b2 | a3 & b3").unwrap();
        let order = names(&["a1", "a2", "a3", "b1", "b2", "b3"]);
        let vars = ["a1", "a2", "a3", "b1", "b2", "b3"];
        let mut bdd = BddBuilder::default().build(&f, &order).unwrap();
        let stats = bdd.sift(Level::new(0), None);
        assert!(stats.final_size < stats.initial_size);
        assert!(stats.reduction_ratio() > 0.0);
        assert_eq!(stats.variables_processed, 6);
        assert!(bdd.is_level_synchronous());
        assert_equivalent(&bdd, &f, &assignments(&vars));
    }

    #[test]
    fn test_sift_respects_start_level() {
        let f = parse_formula("a1 & b1 | a2 & b2 | a3 & b3").unwrap();
        let order = names(&["a1", "a2", "a3", "b1", "b2", "b3"]);
        let mut bdd = BddBuilder::default().build(&f, &order).unwrap();
        let stats = bdd.sift(Level::new(2), Some(2));
        assert_eq!(stats.variables_processed, 2);
        assert_eq!(&bdd.order()[..2], &order[..2]);
    }

    #[test]
    fn test_sift_monotone() {
        let vars = ["a", "b", "c", "d", "e"];
        let all = assignments(&vars);
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..60 {
            let f = random_formula(&mut rng, &vars, 6);
            for kind in [BuilderKind::Naive, BuilderKind::QuasiReduced, BuilderKind::FullyReduced] {
                let mut bdd = BddBuilder::new(kind).build(&f, &names(&vars)).unwrap();
                let stats = bdd.sift(Level::new(0), None);
                assert!(stats.final_size <= stats.initial_size, "{:?}: {}", kind, f);
                assert_eq!(stats.final_size, bdd.size());
                assert_equivalent(&bdd, &f, &all);
            }
        }
    }
}
