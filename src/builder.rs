//! Construction of ordered decision diagrams from formulas.
//!
//! All builders work by recursive Shannon splitting: at level `vi` the residual formula is
//! simplified under `order[vi] = true` and `order[vi] = false`, and each branch is built one
//! level further down. They differ in how much sharing they establish inline:
//!
//! - [`BuilderKind::Naive`] builds the complete decision tree and evaluates the formula at
//!   every leaf. Exponential, but trivially correct; useful as a reference.
//! - [`BuilderKind::QuasiReduced`] produces a level-synchronous diagram. Constant branches
//!   are routed through per-level, per-polarity *rails* (pass-through chains that are built
//!   once per construction and then shared), and a node whose two branch formulas are
//!   syntactically equal gets the same subtree for both children.
//! - [`BuilderKind::FullyReduced`] sends constant branches straight to the terminals and
//!   skips nodes whose branches coincide, so children may sit several levels below.
//!
//! An optional node cutoff aborts construction with [`Error::CutoffReached`] once the arena
//! holds more nodes than allowed (terminals included).

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::reference::Ref;
use crate::types::{Level, Var};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BuilderKind {
    Naive,
    #[default]
    QuasiReduced,
    FullyReduced,
}

#[derive(Debug, Clone, Default)]
pub struct BddBuilder {
    kind: BuilderKind,
    cutoff: Option<usize>,
}

impl BddBuilder {
    pub fn new(kind: BuilderKind) -> Self {
        Self { kind, cutoff: None }
    }

    /// Limits the arena size; `None` or `Some(0)` disables the limit.
    pub fn with_cutoff(mut self, cutoff: Option<usize>) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn kind(&self) -> BuilderKind {
        self.kind
    }

    /// Builds a diagram for `formula` with `order` listed from the top level down.
    ///
    /// The order must mention every variable of the constant-folded formula exactly once;
    /// it may also contain variables the formula does not use.
    pub fn build(&self, formula: &Formula, order: &[String]) -> Result<Bdd> {
        let formula = formula.fold_constants();
        validate_order(&formula, order)?;

        let mut construction = Construction {
            bdd: Bdd::new(order.iter().cloned()),
            cutoff: self.cutoff.filter(|&c| c != 0),
            rails: HashMap::new(),
        };

        let root = match self.kind {
            BuilderKind::Naive => construction.naive(&formula, 0, &mut HashMap::new())?,
            BuilderKind::QuasiReduced => construction.branch(&formula, 0)?,
            BuilderKind::FullyReduced => construction.full(&formula, 0)?,
        };
        construction.bdd.set_root(root);

        debug!(
            "build(kind = {:?}, order = {:?}) -> {} nodes",
            self.kind,
            order,
            construction.bdd.size()
        );
        Ok(construction.bdd)
    }
}

fn validate_order(formula: &Formula, order: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in order {
        if !seen.insert(name.as_str()) {
            return Err(Error::InvalidOrder {
                message: format!("variable '{}' appears more than once", name),
            });
        }
    }
    for name in formula.variables() {
        if !seen.contains(name.as_str()) {
            return Err(Error::InvalidOrder {
                message: format!("variable '{}' is missing", name),
            });
        }
    }
    Ok(())
}

struct Construction {
    bdd: Bdd,
    cutoff: Option<usize>,
    rails: HashMap<(usize, bool), Ref>,
}

impl Construction {
    fn n(&self) -> usize {
        self.bdd.num_vars()
    }

    fn var(&self, vi: usize) -> Var {
        self.bdd.var_at(Level::new(vi))
    }

    fn name(&self, vi: usize) -> String {
        self.bdd.name(self.var(vi)).to_string()
    }

    fn alloc(&mut self, vi: usize, low: Ref, high: Ref) -> Result<Ref> {
        let r = self.bdd.mk_node(self.var(vi), low, high);
        if let Some(limit) = self.cutoff {
            if self.bdd.size() > limit {
                debug!("Node cutoff {} reached at level {}", limit, vi);
                return Err(Error::CutoffReached { limit });
            }
        }
        Ok(r)
    }

    fn naive(&mut self, f: &Formula, vi: usize, assignment: &mut HashMap<String, bool>) -> Result<Ref> {
        if vi == self.n() {
            return Ok(Ref::terminal(f.eval(assignment)?));
        }
        let name = self.name(vi);
        assignment.insert(name.clone(), true);
        let high = self.naive(f, vi + 1, assignment)?;
        assignment.insert(name.clone(), false);
        let low = self.naive(f, vi + 1, assignment)?;
        assignment.remove(&name);
        self.alloc(vi, low, high)
    }

    /// Builds the level-`vi` subdiagram of a branch formula, routing constants through rails.
    fn branch(&mut self, f: &Formula, vi: usize) -> Result<Ref> {
        match f.as_const() {
            Some(value) => self.rail(vi, value),
            None => self.split(f, vi),
        }
    }

    fn split(&mut self, f: &Formula, vi: usize) -> Result<Ref> {
        if vi == self.n() {
            // unreachable for validated orders: all variables have been substituted
            return Err(Error::InvalidOrder {
                message: format!("formula '{}' is not constant below the last level", f),
            });
        }
        let name = self.name(vi);
        let one = f.simplify(&name, true);
        let high = self.branch(&one, vi + 1)?;
        let zero = f.simplify(&name, false);
        let low = if zero.syn_eq(&one) {
            high
        } else {
            self.branch(&zero, vi + 1)?
        };
        self.alloc(vi, low, high)
    }

    fn rail(&mut self, vi: usize, value: bool) -> Result<Ref> {
        if vi == self.n() {
            return Ok(Ref::terminal(value));
        }
        if let Some(&r) = self.rails.get(&(vi, value)) {
            return Ok(r);
        }
        let child = self.rail(vi + 1, value)?;
        let r = self.alloc(vi, child, child)?;
        self.rails.insert((vi, value), r);
        Ok(r)
    }

    fn full(&mut self, f: &Formula, vi: usize) -> Result<Ref> {
        if let Some(value) = f.as_const() {
            return Ok(Ref::terminal(value));
        }
        if vi == self.n() {
            return Err(Error::InvalidOrder {
                message: format!("formula '{}' is not constant below the last level", f),
            });
        }
        let name = self.name(vi);
        let one = f.simplify(&name, true);
        let zero = f.simplify(&name, false);
        let high = self.full(&one, vi + 1)?;
        if zero.syn_eq(&one) {
            return Ok(high);
        }
        let low = self.full(&zero, vi + 1)?;
        if low == high {
            return Ok(high);
        }
        self.alloc(vi, low, high)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::formula::tests::{assignments, random_formula};
    use crate::parser::parse_formula;

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const KINDS: [BuilderKind; 3] = [BuilderKind::Naive, BuilderKind::QuasiReduced, BuilderKind::FullyReduced];

    #[test]
    fn test_naive_truth_table() {
        let f = parse_formula("a & b | c").unwrap();
        let bdd = BddBuilder::new(BuilderKind::Naive).build(&f, &order(&["a", "b", "c"])).unwrap();
        assert_eq!(bdd.size(), 2 + 7);
        assert_eq!(bdd.sat_count(), BigUint::from(5u32));
    }

    #[test]
    fn test_quasi_is_level_synchronous() {
        let f = parse_formula("(a | b) & (c <=> d) | !a & e").unwrap();
        let bdd = BddBuilder::new(BuilderKind::QuasiReduced)
            .build(&f, &order(&["a", "b", "c", "d", "e"]))
            .unwrap();
        assert!(bdd.is_level_synchronous());
        assert!(bdd.size() < 2 + 31);
    }

    #[test]
    fn test_quasi_rails_are_shared() {
        // every constant branch under `a` ends up on the same one-rail
        let f = parse_formula("a | b").unwrap();
        let bdd = BddBuilder::new(BuilderKind::QuasiReduced)
            .build(&f, &order(&["a", "b", "c"]))
            .unwrap();
        // root, test of b, one-rails at levels 1 and 2, zero-rail at level 2
        assert_eq!(bdd.size(), 2 + 5);
        assert_eq!(bdd.sat_count(), BigUint::from(6u32));
    }

    #[test]
    fn test_full_skips_levels() {
        let f = parse_formula("a & c").unwrap();
        let bdd = BddBuilder::new(BuilderKind::FullyReduced)
            .build(&f, &order(&["a", "b", "c"]))
            .unwrap();
        assert_eq!(bdd.size(), 2 + 2);
        assert!(!bdd.is_level_synchronous());
        assert_eq!(bdd.sat_count(), BigUint::from(2u32));
    }

    #[test]
    fn test_cutoff() {
        let f = parse_formula("a ^ b ^ c ^ d").unwrap();
        let names = order(&["a", "b", "c", "d"]);
        let result = BddBuilder::new(BuilderKind::Naive).with_cutoff(Some(8)).build(&f, &names);
        assert!(matches!(result, Err(Error::CutoffReached { limit: 8 })));
        let result = BddBuilder::new(BuilderKind::Naive).with_cutoff(Some(0)).build(&f, &names);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_orders() {
        let f = parse_formula("a & b").unwrap();
        assert!(matches!(
            BddBuilder::default().build(&f, &order(&["a"])),
            Err(Error::InvalidOrder { .. })
        ));
        assert!(matches!(
            BddBuilder::default().build(&f, &order(&["a", "b", "a"])),
            Err(Error::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_empty_order() {
        let f = parse_formula("a <=> a").unwrap();
        for kind in KINDS {
            let bdd = BddBuilder::new(kind).build(&f, &[]).unwrap();
            assert_eq!(bdd.root(), Ref::ONE);
            assert_eq!(bdd.size(), 2);
        }
        let g = parse_formula("false | !true").unwrap();
        let bdd = BddBuilder::default().build(&g, &order(&["x"])).unwrap();
        assert_eq!(bdd.sat_count(), BigUint::ZERO);
        assert!(bdd.is_level_synchronous());
    }

    #[test]
    fn test_soundness_all_builders() {
        let vars = ["a", "b", "c", "d", "e"];
        let names = order(&vars);
        let mut rng = StdRng::seed_from_u64(7);
        let all = assignments(&vars);
        for _ in 0..100 {
            let f = random_formula(&mut rng, &vars, 6);
            for kind in KINDS {
                let bdd = BddBuilder::new(kind).build(&f, &names).unwrap();
                for assignment in &all {
                    assert_eq!(bdd.evaluate(assignment).unwrap(), f.eval(assignment).unwrap(), "{:?}: {}", kind, f);
                }
            }
        }
    }
}
