//! Path conditions and dense select encodings.
//!
//! A *path condition* of a node is the formula, over the variables of the levels above it,
//! under which evaluation of the diagram passes through that node. In a level-synchronous
//! diagram the path conditions of all nodes of one level are mutually exclusive, which makes
//! them a one-hot encoding of "the active node". [`dense_pack`] turns such a one-hot family
//! into a binary select signal, and [`select_prefix`] recognises one value of that signal.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use bdd_lutmap::formula::Formula;
//! use bdd_lutmap::paths::{dense_pack, select_prefix};
//!
//! let conds = vec![Formula::var("p"), Formula::var("q"), Formula::var("r")];
//! let bits = dense_pack(&conds);
//! assert_eq!(bits.len(), 2);
//!
//! // only `r` (index 2 = 0b10) holds
//! let assignment = HashMap::from([
//!     ("p".to_string(), false),
//!     ("q".to_string(), false),
//!     ("r".to_string(), true),
//! ]);
//! assert!(!bits[0].eval(&assignment).unwrap());
//! assert!(bits[1].eval(&assignment).unwrap());
//!
//! let wires = vec!["s0".to_string(), "s1".to_string()];
//! assert_eq!(select_prefix(&wires, 2).to_string(), "(!s0 & s1)");
//! ```

use std::collections::BTreeMap;

use log::trace;

use crate::bdd::Bdd;
use crate::formula::Formula;
use crate::reference::Ref;
use crate::types::Level;

/// Number of bits needed to address `count` distinct values: `ceil(log2(count))`.
pub fn bits_for(count: usize) -> usize {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as usize
    }
}

/// Path conditions from `from` down to the nodes at level `to`.
///
/// Sweeps the levels between `from` and `to` once, top-down, accumulating for every node
/// the disjunction over its incoming edges of `parent condition & literal`. When both
/// children of a node coincide, the parent condition is passed on unqualified.
/// Terminals are returned when `to` is the terminal level. Nodes at level `to` that are
/// not reachable from `from` are absent from the result.
///
/// Expects a level-synchronous diagram.
pub fn path_conditions(bdd: &Bdd, from: Ref, to: Level) -> BTreeMap<Ref, Formula> {
    let mut frontier = BTreeMap::from([(from, Formula::tt())]);
    let mut level = bdd.level(from);

    while level < to {
        let mut next: BTreeMap<Ref, Formula> = BTreeMap::new();
        for (node, cond) in frontier {
            let (low, high) = (bdd.low(node), bdd.high(node));
            let mut push = |child: Ref, f: Formula| {
                let acc = next.remove(&child).unwrap_or_else(Formula::ff);
                next.insert(child, Formula::mk_or(acc, f));
            };
            if low == high {
                push(low, cond);
            } else {
                let name = match bdd.variable(node) {
                    Some(var) => bdd.name(var),
                    None => continue,
                };
                let literal = Formula::var(name);
                push(high, Formula::mk_and(cond.clone(), literal.clone()));
                push(low, Formula::mk_and(cond, Formula::mk_not(literal)));
            }
        }
        frontier = next;
        level = level.next();
    }

    trace!("path_conditions({} -> {}): {} targets", from, to, frontier.len());
    frontier
}

/// Packs mutually exclusive formulas into `bits_for(formulas.len())` output bits.
///
/// Bit `b` (LSB first) is the disjunction of every formula whose index has bit `b` set,
/// so whenever exactly formula `i` holds the bit vector spells `i` in binary.
pub fn dense_pack(formulas: &[Formula]) -> Vec<Formula> {
    (0..bits_for(formulas.len()))
        .map(|bit| {
            Formula::disjunction(
                formulas
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i >> bit & 1 == 1)
                    .map(|(_, f)| f.clone()),
            )
        })
        .collect()
}

/// Formula that holds exactly when the select wires (LSB first) encode `index`.
/// An empty select signal always holds.
pub fn select_prefix(wires: &[String], index: usize) -> Formula {
    Formula::conjunction(wires.iter().enumerate().map(|(bit, wire)| {
        let literal = Formula::var(wire.as_str());
        if index >> bit & 1 == 1 {
            literal
        } else {
            Formula::mk_not(literal)
        }
    }))
}
