//! Boolean formulas over named variables.
//!
//! A [`Formula`] is a cheap, reference-counted handle to an immutable [`Expr`] node.
//! Simplification reuses unchanged sub-formulas and caches results per node, so the
//! runtime structure is a DAG: one simplified sub-formula may be shared by many parents.
//!
//! # Simplification
//!
//! [`Formula::simplify`] substitutes a single variable with a constant and folds the
//! result bottom-up:
//!
//! - `And`/`Or` absorb the neutral constant and collapse on the dominating one
//! - `!!x` becomes `x`
//! - `x <=> x` becomes `true`, and an `Equiv` with a constant side folds to the other side
//!   (negated for `false`)
//!
//! Every call is one *pass* with its own memo table keyed by node identity, so a node
//! reachable from several parents is simplified once and all parents see the same result.
//!
//! # Examples
//!
//! ```
//! use bdd_lutmap::formula::Formula;
//!
//! let f = Formula::or(Formula::and(Formula::var("a"), Formula::var("b")), Formula::var("c"));
//! assert_eq!(f.simplify("c", true).as_const(), Some(true));
//! assert_eq!(f.simplify("a", false).to_string(), "c");
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::error::{Error, Result};

/// One formula node.
#[derive(Debug)]
pub enum Expr {
    Var(String),
    True,
    False,
    Not(Formula),
    And(Formula, Formula),
    Or(Formula, Formula),
    Equiv(Formula, Formula),
}

/// Shared handle to an immutable formula node.
#[derive(Debug, Clone)]
pub struct Formula(Rc<Expr>);

impl Formula {
    pub fn new(expr: Expr) -> Self {
        Formula(Rc::new(expr))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Formula::new(Expr::Var(name.into()))
    }

    pub fn tt() -> Self {
        Formula::new(Expr::True)
    }

    pub fn ff() -> Self {
        Formula::new(Expr::False)
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Formula::tt()
        } else {
            Formula::ff()
        }
    }

    pub fn not(f: Formula) -> Self {
        Formula::new(Expr::Not(f))
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Formula::new(Expr::And(left, right))
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Formula::new(Expr::Or(left, right))
    }

    pub fn equiv(left: Formula, right: Formula) -> Self {
        Formula::new(Expr::Equiv(left, right))
    }

    /// Negation that folds constants and cancels double negation.
    pub fn mk_not(f: Formula) -> Self {
        match f.expr() {
            Expr::True => Formula::ff(),
            Expr::False => Formula::tt(),
            Expr::Not(inner) => inner.clone(),
            _ => Formula::not(f),
        }
    }

    /// Conjunction that folds constant operands.
    pub fn mk_and(left: Formula, right: Formula) -> Self {
        match (left.as_const(), right.as_const()) {
            (Some(false), _) | (_, Some(false)) => Formula::ff(),
            (Some(true), _) => right,
            (_, Some(true)) => left,
            _ => Formula::and(left, right),
        }
    }

    /// Disjunction that folds constant operands.
    pub fn mk_or(left: Formula, right: Formula) -> Self {
        match (left.as_const(), right.as_const()) {
            (Some(true), _) | (_, Some(true)) => Formula::tt(),
            (Some(false), _) => right,
            (_, Some(false)) => left,
            _ => Formula::or(left, right),
        }
    }

    /// Folding conjunction of all items; `true` when empty.
    pub fn conjunction(items: impl IntoIterator<Item = Formula>) -> Self {
        items.into_iter().fold(Formula::tt(), Formula::mk_and)
    }

    /// Folding disjunction of all items; `false` when empty.
    pub fn disjunction(items: impl IntoIterator<Item = Formula>) -> Self {
        items.into_iter().fold(Formula::ff(), Formula::mk_or)
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    /// Returns the value of a constant formula.
    pub fn as_const(&self) -> Option<bool> {
        match self.expr() {
            Expr::True => Some(true),
            Expr::False => Some(false),
            _ => None,
        }
    }

    /// Returns `true` if both handles point to the same node.
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Evaluates the formula under a complete assignment.
    ///
    /// `And` and `Or` short-circuit, so a variable is only required
    /// if evaluation actually reaches it.
    pub fn eval(&self, assignment: &HashMap<String, bool>) -> Result<bool> {
        let mut memo = HashMap::new();
        self.eval_rec(assignment, &mut memo)
    }

    fn eval_rec(&self, assignment: &HashMap<String, bool>, memo: &mut HashMap<usize, bool>) -> Result<bool> {
        if let Some(&value) = memo.get(&self.key()) {
            return Ok(value);
        }
        let value = match self.expr() {
            Expr::Var(name) => assignment
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnboundVariable { name: name.clone() })?,
            Expr::True => true,
            Expr::False => false,
            Expr::Not(child) => !child.eval_rec(assignment, memo)?,
            Expr::And(left, right) => left.eval_rec(assignment, memo)? && right.eval_rec(assignment, memo)?,
            Expr::Or(left, right) => left.eval_rec(assignment, memo)? || right.eval_rec(assignment, memo)?,
            Expr::Equiv(left, right) => left.eval_rec(assignment, memo)? == right.eval_rec(assignment, memo)?,
        };
        memo.insert(self.key(), value);
        Ok(value)
    }

    /// Substitutes `value` for `variable` and folds the result.
    pub fn simplify(&self, variable: &str, value: bool) -> Formula {
        Simplifier::new(Some((variable, value))).run(self)
    }

    /// Folds constants without substituting anything.
    pub fn fold_constants(&self) -> Formula {
        Simplifier::new(None).run(self)
    }

    /// Structural equality.
    ///
    /// Implies semantic equivalence but not the other way around.
    pub fn syn_eq(&self, other: &Formula) -> bool {
        syn_eq_memo(self, other, &mut HashSet::new())
    }

    /// Number of nodes of the formula viewed as a tree (shared nodes count once per use).
    pub fn size(&self) -> u64 {
        fn rec(f: &Formula, memo: &mut HashMap<usize, u64>) -> u64 {
            if let Some(&size) = memo.get(&f.key()) {
                return size;
            }
            let size = match f.expr() {
                Expr::Var(_) | Expr::True | Expr::False => 1,
                Expr::Not(child) => rec(child, memo).saturating_add(1),
                Expr::And(l, r) | Expr::Or(l, r) | Expr::Equiv(l, r) => {
                    rec(l, memo).saturating_add(rec(r, memo)).saturating_add(1)
                }
            };
            memo.insert(f.key(), size);
            size
        }
        rec(self, &mut HashMap::new())
    }

    /// Distinct variable names, in order of first (left-to-right) occurrence.
    pub fn variables(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut names = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(f) = stack.pop() {
            if !visited.insert(f.key()) {
                continue;
            }
            match f.expr() {
                Expr::Var(name) => {
                    if names.insert(name.clone()) {
                        result.push(name.clone());
                    }
                }
                Expr::True | Expr::False => {}
                Expr::Not(child) => stack.push(child.clone()),
                Expr::And(l, r) | Expr::Or(l, r) | Expr::Equiv(l, r) => {
                    stack.push(r.clone());
                    stack.push(l.clone());
                }
            }
        }
        result
    }

    /// Per-variable weight: every binary connective halves the weight passed to its
    /// operands, leaves contribute the weight that reaches them.
    ///
    /// Variables whose share rounds down to zero are reported with weight 0.
    pub fn var_weights(&self, base: u64) -> HashMap<String, u64> {
        type Memo = HashMap<(usize, u64), Rc<HashMap<String, u64>>>;

        fn rec(f: &Formula, weight: u64, memo: &mut Memo) -> Rc<HashMap<String, u64>> {
            if weight == 0 {
                return Rc::default();
            }
            if let Some(cached) = memo.get(&(f.key(), weight)) {
                return cached.clone();
            }
            let result = match f.expr() {
                Expr::Var(name) => Rc::new(HashMap::from([(name.clone(), weight)])),
                Expr::True | Expr::False => Rc::default(),
                Expr::Not(child) => rec(child, weight, memo),
                Expr::And(l, r) | Expr::Or(l, r) | Expr::Equiv(l, r) => {
                    let left = rec(l, weight / 2, memo);
                    let right = rec(r, weight / 2, memo);
                    Rc::new(merge_tallies(&left, &right))
                }
            };
            memo.insert((f.key(), weight), result.clone());
            result
        }

        let mut weights: HashMap<String, u64> = self.variables().into_iter().map(|v| (v, 0)).collect();
        for (name, w) in rec(self, base, &mut HashMap::new()).iter() {
            weights.insert(name.clone(), *w);
        }
        weights
    }

    /// Number of leaf occurrences of every variable.
    pub fn var_counts(&self) -> HashMap<String, u64> {
        fn rec(f: &Formula, memo: &mut HashMap<usize, Rc<HashMap<String, u64>>>) -> Rc<HashMap<String, u64>> {
            if let Some(cached) = memo.get(&f.key()) {
                return cached.clone();
            }
            let result = match f.expr() {
                Expr::Var(name) => Rc::new(HashMap::from([(name.clone(), 1)])),
                Expr::True | Expr::False => Rc::default(),
                Expr::Not(child) => rec(child, memo),
                Expr::And(l, r) | Expr::Or(l, r) | Expr::Equiv(l, r) => {
                    let left = rec(l, memo);
                    let right = rec(r, memo);
                    Rc::new(merge_tallies(&left, &right))
                }
            };
            memo.insert(f.key(), result.clone());
            result
        }

        rec(self, &mut HashMap::new()).as_ref().clone()
    }
}

fn merge_tallies(a: &HashMap<String, u64>, b: &HashMap<String, u64>) -> HashMap<String, u64> {
    let mut merged = a.clone();
    for (name, value) in b {
        let entry = merged.entry(name.clone()).or_insert(0);
        *entry = entry.saturating_add(*value);
    }
    merged
}

fn syn_eq_memo(a: &Formula, b: &Formula, equal: &mut HashSet<(usize, usize)>) -> bool {
    if a.ptr_eq(b) || equal.contains(&(a.key(), b.key())) {
        return true;
    }
    let result = match (a.expr(), b.expr()) {
        (Expr::Var(x), Expr::Var(y)) => x == y,
        (Expr::True, Expr::True) | (Expr::False, Expr::False) => true,
        (Expr::Not(x), Expr::Not(y)) => syn_eq_memo(x, y, equal),
        (Expr::And(a1, a2), Expr::And(b1, b2))
        | (Expr::Or(a1, a2), Expr::Or(b1, b2))
        | (Expr::Equiv(a1, a2), Expr::Equiv(b1, b2)) => syn_eq_memo(a1, b1, equal) && syn_eq_memo(a2, b2, equal),
        _ => false,
    };
    if result {
        equal.insert((a.key(), b.key()));
    }
    result
}

/// State of one simplification pass.
struct Simplifier<'a> {
    binding: Option<(&'a str, bool)>,
    memo: HashMap<usize, Formula>,
    equal: HashSet<(usize, usize)>,
}

impl<'a> Simplifier<'a> {
    fn new(binding: Option<(&'a str, bool)>) -> Self {
        Self {
            binding,
            memo: HashMap::new(),
            equal: HashSet::new(),
        }
    }

    fn run(&mut self, f: &Formula) -> Formula {
        if let Some(cached) = self.memo.get(&f.key()) {
            return cached.clone();
        }
        let result = self.step(f);
        self.memo.insert(f.key(), result.clone());
        result
    }

    fn step(&mut self, f: &Formula) -> Formula {
        match f.expr() {
            Expr::Var(name) => match self.binding {
                Some((variable, value)) if variable == name => Formula::from_bool(value),
                _ => f.clone(),
            },
            Expr::True | Expr::False => f.clone(),
            Expr::Not(child) => {
                let s = self.run(child);
                match s.expr() {
                    Expr::True => Formula::ff(),
                    Expr::False => Formula::tt(),
                    Expr::Not(inner) => inner.clone(),
                    _ if s.ptr_eq(child) => f.clone(),
                    _ => Formula::not(s),
                }
            }
            Expr::And(l, r) => {
                let sl = self.run(l);
                if sl.as_const() == Some(false) {
                    return Formula::ff();
                }
                let sr = self.run(r);
                match (sl.as_const(), sr.as_const()) {
                    (_, Some(false)) => Formula::ff(),
                    (Some(true), _) => sr,
                    (_, Some(true)) => sl,
                    _ if sl.ptr_eq(l) && sr.ptr_eq(r) => f.clone(),
                    _ => Formula::and(sl, sr),
                }
            }
            Expr::Or(l, r) => {
                let sl = self.run(l);
                if sl.as_const() == Some(true) {
                    return Formula::tt();
                }
                let sr = self.run(r);
                match (sl.as_const(), sr.as_const()) {
                    (_, Some(true)) => Formula::tt(),
                    (Some(false), _) => sr,
                    (_, Some(false)) => sl,
                    _ if sl.ptr_eq(l) && sr.ptr_eq(r) => f.clone(),
                    _ => Formula::or(sl, sr),
                }
            }
            Expr::Equiv(l, r) => {
                let sl = self.run(l);
                let sr = self.run(r);
                if syn_eq_memo(&sl, &sr, &mut self.equal) {
                    return Formula::tt();
                }
                match (sl.as_const(), sr.as_const()) {
                    (Some(_), Some(_)) => Formula::ff(),
                    (Some(true), None) => sr,
                    (None, Some(true)) => sl,
                    (Some(false), None) => Formula::mk_not(sr),
                    (None, Some(false)) => Formula::mk_not(sl),
                    _ if sl.ptr_eq(l) && sr.ptr_eq(r) => f.clone(),
                    _ => Formula::equiv(sl, sr),
                }
            }
        }
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.expr() {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::True => write!(f, "true"),
            Expr::False => write!(f, "false"),
            Expr::Not(child) => write!(f, "!{}", child),
            Expr::And(l, r) => write!(f, "({} & {})", l, r),
            Expr::Or(l, r) => write!(f, "({} | {})", l, r),
            Expr::Equiv(l, r) => write!(f, "({} <=> {})", l, r),
        }
    }
}
