//! Bottom-up canonicalization of decision diagrams.
//!
//! [`Bdd::reduce`] processes levels from the bottom up. Each node first has its children
//! replaced by their representatives (children always sit on already processed levels),
//! then:
//!
//! 1. In [`Reduction::Full`] mode a node with `low == high` is spliced out: it forwards to
//!    its child. [`Reduction::Quasi`] keeps such nodes to preserve level synchrony.
//! 2. Nodes of one level with identical `(low, high)` pairs are merged into the first one.
//!
//! Forwarding is recorded in a table instead of rewriting parent pointers, so no parent
//! index is needed. Finally the root is forwarded and the arena is compacted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::Level;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// Merge duplicates and remove redundant tests; levels may be skipped afterwards.
    Full,
    /// Merge duplicates only; a level-synchronous diagram stays level-synchronous.
    Quasi,
}

impl Bdd {
    /// Reduces the diagram in place and returns the compacted arena size.
    pub fn reduce(&mut self, mode: Reduction) -> usize {
        let before = self.size();
        let levels = self.nodes_by_level();
        let mut forward: HashMap<Ref, Ref> = HashMap::new();
        let resolve = |forward: &HashMap<Ref, Ref>, r: Ref| forward.get(&r).copied().unwrap_or(r);

        for level in levels.iter().rev() {
            let mut unique: HashMap<(Ref, Ref), Ref> = HashMap::with_capacity(level.len());
            for &r in level {
                let low = resolve(&forward, self.low(r));
                let high = resolve(&forward, self.high(r));
                let node = self.node_mut(r);
                node.low = low;
                node.high = high;

                if mode == Reduction::Full && low == high {
                    forward.insert(r, low);
                    continue;
                }
                match unique.entry((low, high)) {
                    Entry::Occupied(e) => {
                        forward.insert(r, *e.get());
                    }
                    Entry::Vacant(e) => {
                        e.insert(r);
                    }
                }
            }
        }

        let root = resolve(&forward, self.root());
        self.set_root(root);
        let after = self.collect_garbage();
        debug!("reduce(mode = {:?}): {} -> {} nodes", mode, before, after);
        after
    }

    /// Inserts pass-through nodes on every edge that skips levels, turning a fully
    /// reduced diagram into a level-synchronous one over the same order.
    pub fn make_level_synchronous(&mut self) -> usize {
        let mut chains: HashMap<(Ref, usize), Ref> = HashMap::new();
        for r in self.descendants() {
            if r.is_terminal() {
                continue;
            }
            let next = self.level(r).index() + 1;
            let low = self.lift(self.low(r), next, &mut chains);
            let high = self.lift(self.high(r), next, &mut chains);
            let node = self.node_mut(r);
            node.low = low;
            node.high = high;
        }
        let root = self.lift(self.root(), 0, &mut chains);
        self.set_root(root);
        self.collect_garbage()
    }

    /// Node at `level` that passes straight through to `target`.
    fn lift(&mut self, target: Ref, level: usize, chains: &mut HashMap<(Ref, usize), Ref>) -> Ref {
        if level >= self.level(target).index() {
            return target;
        }
        if let Some(&r) = chains.get(&(target, level)) {
            return r;
        }
        let child = self.lift(target, level + 1, chains);
        let r = self.mk_node(self.var_at(Level::new(level)), child, child);
        chains.insert((target, level), r);
        r
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::builder::{BddBuilder, BuilderKind};
    use crate::formula::tests::{assignments, random_formula};

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_quasi_merges_duplicates() {
        let f = crate::parser::parse_formula("a & b | c").unwrap();
        let mut bdd = BddBuilder::new(BuilderKind::QuasiReduced)
            .build(&f, &names(&["a", "b", "c"]))
            .unwrap();
        // the test of `c` is built twice, once under each branch of `a`
        assert_eq!(bdd.size(), 8);
        assert_eq!(bdd.reduce(Reduction::Quasi), 7);
        assert!(bdd.is_level_synchronous());
    }

    #[test]
    fn test_full_reduction_of_naive_tree() {
        let f = crate::parser::parse_formula("a & b | c").unwrap();
        let mut bdd = BddBuilder::new(BuilderKind::Naive)
            .build(&f, &names(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(bdd.reduce(Reduction::Full), 2 + 3);
        assert_eq!(bdd.level(bdd.root()), Level::new(0));
    }

    #[test]
    fn test_constant_collapses_to_terminal() {
        let f = crate::parser::parse_formula("a | !a").unwrap();
        let mut bdd = BddBuilder::new(BuilderKind::Naive).build(&f, &names(&["a"])).unwrap();
        assert_eq!(bdd.reduce(Reduction::Full), 2);
        assert_eq!(bdd.root(), Ref::ONE);
    }

    #[test]
    fn test_reduction_idempotent_and_sound() {
        let vars = ["a", "b", "c", "d", "e"];
        let order = names(&vars);
        let all = assignments(&vars);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let f = random_formula(&mut rng, &vars, 6);
            for mode in [Reduction::Quasi, Reduction::Full] {
                let mut bdd = BddBuilder::new(BuilderKind::Naive).build(&f, &order).unwrap();
                bdd.reduce(mode);
                let once = bdd.nodes().to_vec();
                let root = bdd.root();
                bdd.reduce(mode);
                assert_eq!(once, bdd.nodes());
                assert_eq!(root, bdd.root());
                if mode == Reduction::Quasi {
                    assert!(bdd.is_level_synchronous());
                }
                for assignment in &all {
                    assert_eq!(bdd.evaluate(assignment).unwrap(), f.eval(assignment).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_quasi_reduction_is_canonical() {
        let vars = ["a", "b", "c", "d"];
        let order = names(&vars);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let f = random_formula(&mut rng, &vars, 5);
            let mut naive = BddBuilder::new(BuilderKind::Naive).build(&f, &order).unwrap();
            let mut quasi = BddBuilder::new(BuilderKind::QuasiReduced).build(&f, &order).unwrap();
            let mut full = BddBuilder::new(BuilderKind::FullyReduced).build(&f, &order).unwrap();
            full.make_level_synchronous();
            assert!(full.is_level_synchronous());
            let a = naive.reduce(Reduction::Quasi);
            let b = quasi.reduce(Reduction::Quasi);
            let c = full.reduce(Reduction::Quasi);
            assert_eq!(a, b, "{}", f);
            assert_eq!(a, c, "{}", f);
        }
    }
}
