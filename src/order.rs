//! Candidate variable orders derived from formula statistics.
//!
//! Every heuristic is a pure function of the formula. The mapper tries several of them and
//! keeps whichever order gives the smallest diagram.
//!
//! - **count**: most frequently occurring variables first
//! - **weight**: variables closest to the root first (see [`Formula::var_weights`])
//! - **hybrid**: `count * factor + weight`, i.e. count first with weight as tie-break
//! - **subgraph complexity**: greedily pick the variable and polarity whose substitution
//!   leaves the smallest residual formula
//!
//! All sorts are stable over the first-occurrence order, so results are deterministic.

use std::collections::HashMap;
use std::str::FromStr;

use log::debug;

use crate::error::Error;
use crate::formula::Formula;

/// Weight handed to the root of the formula by [`OrderHeuristics::var_weight`].
pub const WEIGHT_BASE: u64 = i32::MAX as u64;

/// Which candidate orders to try.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderHeuristic {
    /// All heuristics below, deduplicated.
    #[default]
    Mixed,
    /// First occurrence in the formula.
    None,
    Weight,
    Count,
    Subgraph,
    /// A fixed, user-supplied order.
    Explicit(Vec<String>),
}

impl OrderHeuristic {
    pub fn orders(&self, formula: &Formula) -> Vec<Vec<String>> {
        let heuristics = OrderHeuristics::new(formula);
        match self {
            OrderHeuristic::Mixed => heuristics.mix(),
            OrderHeuristic::None => vec![heuristics.first_occurrence()],
            OrderHeuristic::Weight => vec![heuristics.var_weight()],
            OrderHeuristic::Count => vec![heuristics.var_count()],
            OrderHeuristic::Subgraph => vec![heuristics.subgraph_complexity()],
            OrderHeuristic::Explicit(order) => vec![order.clone()],
        }
    }
}

impl FromStr for OrderHeuristic {
    type Err = Error;

    /// Accepts a heuristic name or a comma-separated explicit order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mixed" | "mix" => Ok(OrderHeuristic::Mixed),
            "none" => Ok(OrderHeuristic::None),
            "weight" => Ok(OrderHeuristic::Weight),
            "count" => Ok(OrderHeuristic::Count),
            "subgraph" => Ok(OrderHeuristic::Subgraph),
            "" => Err(Error::InvalidOrder {
                message: "empty order".to_string(),
            }),
            list => Ok(OrderHeuristic::Explicit(
                list.split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            )),
        }
    }
}

pub struct OrderHeuristics {
    formula: Formula,
    variables: Vec<String>,
    counts: HashMap<String, u64>,
    weights: HashMap<String, u64>,
}

impl OrderHeuristics {
    pub fn new(formula: &Formula) -> Self {
        Self {
            formula: formula.clone(),
            variables: formula.variables(),
            counts: formula.var_counts(),
            weights: formula.var_weights(WEIGHT_BASE),
        }
    }

    pub fn first_occurrence(&self) -> Vec<String> {
        self.variables.clone()
    }

    fn sorted_descending(&self, score: impl Fn(&str) -> u64) -> Vec<String> {
        let mut order = self.variables.clone();
        order.sort_by(|a, b| score(b).cmp(&score(a)));
        order
    }

    fn count(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    fn weight(&self, name: &str) -> u64 {
        self.weights.get(name).copied().unwrap_or(0)
    }

    pub fn var_count(&self) -> Vec<String> {
        self.sorted_descending(|v| self.count(v))
    }

    pub fn var_weight(&self) -> Vec<String> {
        self.sorted_descending(|v| self.weight(v))
    }

    pub fn weight_count_hybrid(&self, factor: u64) -> Vec<String> {
        self.sorted_descending(|v| self.count(v).saturating_mul(factor).saturating_add(self.weight(v)))
    }

    /// Greedy order: at each step, substitute every remaining variable with both
    /// constants and keep the one giving the smallest residual formula.
    /// Candidates are visited by name; the first minimum wins.
    pub fn subgraph_complexity(&self) -> Vec<String> {
        let mut remaining = self.variables.clone();
        remaining.sort();
        let mut order = Vec::with_capacity(remaining.len());
        let mut residual = self.formula.clone();

        while !remaining.is_empty() {
            let mut best: Option<(u64, usize, Formula)> = None;
            for (i, name) in remaining.iter().enumerate() {
                for value in [true, false] {
                    let candidate = residual.simplify(name, value);
                    let size = candidate.size();
                    if best.as_ref().map_or(true, |(best_size, _, _)| size < *best_size) {
                        best = Some((size, i, candidate));
                    }
                }
            }
            let Some((_, index, next)) = best else {
                break;
            };
            order.push(remaining.remove(index));
            residual = next;
        }

        order
    }

    /// All heuristic orders, duplicates removed, in the order they should be tried.
    pub fn mix(&self) -> Vec<Vec<String>> {
        let candidates = [
            self.var_count(),
            self.subgraph_complexity(),
            self.weight_count_hybrid(10_000_000),
            self.weight_count_hybrid(1_000_000),
            self.var_weight(),
        ];
        let mut orders: Vec<Vec<String>> = Vec::new();
        for order in candidates {
            if !orders.contains(&order) {
                orders.push(order);
            }
        }
        debug!("mix: {} distinct candidate orders", orders.len());
        orders
    }
}
