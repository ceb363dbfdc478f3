//! Arena-backed ordered decision diagrams.
//!
//! A [`Bdd`] owns a flat vector of [`Node`]s addressed by [`Ref`] handles, a single root,
//! and a variable table mapping every [`Var`] to its name and current [`Level`].
//! Nodes are shared freely between parents; the arena owns them as a whole.
//!
//! The two terminals always occupy the first two slots ([`Ref::ZERO`], [`Ref::ONE`]) and
//! are considered to sit at level `num_vars()`, below every decision level.
//!
//! Mutating passes (sifting, reduction) may leave unreachable nodes behind.
//! [`Bdd::collect_garbage`] drops them and compacts the arena into the canonical layout:
//! zero, one, then the reachable nodes level by level.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use bdd_lutmap::bdd::Bdd;
//! use bdd_lutmap::reference::Ref;
//! use bdd_lutmap::types::Level;
//!
//! // x & y, quasi-reduced: every path visits both levels
//! let mut bdd = Bdd::new(["x", "y"]);
//! let y = bdd.var_at(Level::new(1));
//! let x = bdd.var_at(Level::new(0));
//! let rail = bdd.mk_node(y, Ref::ZERO, Ref::ZERO);
//! let test_y = bdd.mk_node(y, Ref::ZERO, Ref::ONE);
//! let root = bdd.mk_node(x, rail, test_y);
//! bdd.set_root(root);
//!
//! let assignment = HashMap::from([("x".to_string(), true), ("y".to_string(), true)]);
//! assert!(bdd.evaluate(&assignment).unwrap());
//! assert_eq!(bdd.sat_count(), num_bigint::BigUint::from(1u32));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use num_bigint::BigUint;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::reference::Ref;
use crate::types::{Level, Var, Variable};

#[derive(Debug, Clone)]
pub struct Bdd {
    nodes: Vec<Node>,
    root: Ref,
    variables: Vec<Variable>,
    order: Vec<Var>,
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(Vec::<String>::new())
    }
}

impl Bdd {
    /// Creates an empty diagram (rooted at the zero terminal) over the given
    /// variables, ordered top to bottom as listed.
    pub fn new<S: Into<String>>(order: impl IntoIterator<Item = S>) -> Self {
        let variables: Vec<Variable> = order
            .into_iter()
            .enumerate()
            .map(|(i, name)| Variable::new(name, Level::new(i)))
            .collect();
        let order = (0..variables.len()).map(|i| Var::new(i as u32)).collect();
        Self {
            nodes: vec![Node::terminal(false), Node::terminal(true)],
            root: Ref::ZERO,
            variables,
            order,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Number of allocated nodes, terminals included.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> Ref {
        self.root
    }

    pub fn set_root(&mut self, root: Ref) {
        self.root = root;
    }

    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, r: Ref) -> bool {
        r == Ref::ZERO
    }

    pub fn is_one(&self, r: Ref) -> bool {
        r == Ref::ONE
    }

    pub fn node(&self, r: Ref) -> &Node {
        &self.nodes[r.index()]
    }

    pub(crate) fn node_mut(&mut self, r: Ref) -> &mut Node {
        &mut self.nodes[r.index()]
    }

    pub fn low(&self, r: Ref) -> Ref {
        self.nodes[r.index()].low
    }

    pub fn high(&self, r: Ref) -> Ref {
        self.nodes[r.index()].high
    }

    pub fn variable(&self, r: Ref) -> Option<Var> {
        self.nodes[r.index()].variable
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn name(&self, var: Var) -> &str {
        &self.variables[var.index()].name
    }

    /// Variable currently placed at `level`.
    pub fn var_at(&self, level: Level) -> Var {
        self.order[level.index()]
    }

    pub fn level_of(&self, var: Var) -> Level {
        self.variables[var.index()].level
    }

    /// Level of a node; terminals sit at `num_vars()`.
    pub fn level(&self, r: Ref) -> Level {
        match self.variable(r) {
            Some(var) => self.level_of(var),
            None => Level::new(self.num_vars()),
        }
    }

    /// Variable names from the top level to the bottom one.
    pub fn order(&self) -> Vec<String> {
        self.order.iter().map(|&v| self.name(v).to_string()).collect()
    }

    /// Appends a decision node to the arena.
    ///
    /// No sharing check is performed: the builders and the sifter decide sharing themselves.
    pub fn mk_node(&mut self, variable: Var, low: Ref, high: Ref) -> Ref {
        let r = Ref::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(variable, low, high));
        r
    }

    /// Exchanges the variables at `level` and `level + 1` in the order bookkeeping only.
    pub(crate) fn swap_order(&mut self, level: Level) {
        let i = level.index();
        self.order.swap(i, i + 1);
        let upper = self.order[i];
        let lower = self.order[i + 1];
        self.variables[upper.index()].level = Level::new(i);
        self.variables[lower.index()].level = Level::new(i + 1);
    }

    /// All nodes reachable from the root, in BFS order.
    pub fn descendants(&self) -> Vec<Ref> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::from([self.root]);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                result.push(node);
                if !node.is_terminal() {
                    queue.push_back(self.low(node));
                    queue.push_back(self.high(node));
                }
            }
        }

        result
    }

    /// Reachable decision nodes grouped by level, each group sorted by arena index.
    pub fn nodes_by_level(&self) -> Vec<Vec<Ref>> {
        let mut levels = vec![Vec::new(); self.num_vars()];
        for r in self.descendants() {
            if !r.is_terminal() {
                levels[self.level(r).index()].push(r);
            }
        }
        for level in levels.iter_mut() {
            level.sort();
        }
        levels
    }

    /// Drops unreachable nodes and compacts the arena into
    /// zero, one, then the reachable nodes in level order.
    ///
    /// Invalidates every previously obtained [`Ref`] except the terminals.
    /// Returns the new arena size.
    pub fn collect_garbage(&mut self) -> usize {
        let levels = self.nodes_by_level();
        let mut remap: HashMap<Ref, Ref> = HashMap::from([(Ref::ZERO, Ref::ZERO), (Ref::ONE, Ref::ONE)]);
        let mut survivors = Vec::new();
        for r in levels.into_iter().flatten() {
            remap.insert(r, Ref::new(2 + survivors.len() as u32));
            survivors.push(r);
        }

        let mut nodes = Vec::with_capacity(2 + survivors.len());
        nodes.push(Node::terminal(false));
        nodes.push(Node::terminal(true));
        for r in survivors {
            let old = self.node(r);
            nodes.push(Node {
                variable: old.variable,
                low: remap[&old.low],
                high: remap[&old.high],
            });
        }

        debug!("collect_garbage: {} -> {} nodes", self.nodes.len(), nodes.len());
        self.root = remap[&self.root];
        self.nodes = nodes;
        self.nodes.len()
    }

    /// Follows the path selected by `assignment` from the root to a terminal.
    pub fn evaluate(&self, assignment: &HashMap<String, bool>) -> Result<bool> {
        let mut current = self.root;
        while let Some(var) = self.variable(current) {
            let name = self.name(var);
            let value = assignment
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnboundVariable { name: name.to_string() })?;
            current = self.node(current).child(value);
        }
        Ok(self.is_one(current))
    }

    /// Number of satisfying assignments over all `num_vars()` variables.
    ///
    /// Works for both level-synchronous and level-skipping diagrams.
    pub fn sat_count(&self) -> BigUint {
        let mut cache = HashMap::new();
        let count = self._sat_count(self.root, &mut cache);
        count << self.level(self.root).index()
    }

    fn _sat_count(&self, node: Ref, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return BigUint::from(1u32);
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let level = self.level(node).index();
        let mut count = BigUint::ZERO;
        for child in [self.low(node), self.high(node)] {
            let skipped = self.level(child).index() - level - 1;
            count += self._sat_count(child, cache) << skipped;
        }

        cache.insert(node, count.clone());
        count
    }

    /// Checks that the root is at the top and that every reachable decision node
    /// has both children exactly one level below it.
    pub fn is_level_synchronous(&self) -> bool {
        if self.num_vars() > 0 && self.level(self.root).index() != 0 {
            return false;
        }
        self.descendants().into_iter().filter(|r| !r.is_terminal()).all(|r| {
            let next = self.level(r).next();
            self.level(self.low(r)) == next && self.level(self.high(r)) == next
        })
    }
}
