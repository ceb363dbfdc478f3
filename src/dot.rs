//! Diagram dumps: DOT (Graphviz) for viewing and JSON for external tools.
//!
//! # DOT Format
//!
//! - **Terminal nodes** (0 and 1) are boxes in the bottom rank
//! - **Decision nodes** are circles labeled with their variable name, one rank per level
//! - **Edges**: solid lines are one (high) edges, dotted lines are zero (low) edges
//! - A box labeled `f` at the top points to the root
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "root": 4,
//!   "zeroNode": 0,
//!   "oneNode": 1,
//!   "nodes": [
//!     {"variable": "0", "zeroChild": null, "oneChild": null},
//!     {"variable": "1", "zeroChild": null, "oneChild": null},
//!     {"variable": "y", "zeroChild": 0, "oneChild": 1},
//!     ...
//!   ]
//! }
//! ```
//!
//! Node indices are arena indices, so every allocated node is listed, reachable or not.
//!
//! # Examples
//!
//! ```
//! use bdd_lutmap::builder::BddBuilder;
//! use bdd_lutmap::parser::parse_formula;
//!
//! let f = parse_formula("x & y").unwrap();
//! let bdd = BddBuilder::default().build(&f, &["x".to_string(), "y".to_string()]).unwrap();
//! let dot = bdd.to_dot().unwrap();
//! assert!(dot.starts_with("digraph {"));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::bdd::Bdd;
use crate::reference::Ref;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for decision nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for terminal nodes (default: "box")
    pub terminal_shape: &'static str,
    /// Shape for the root marker (default: "box")
    pub root_shape: &'static str,
    /// Style for one (high) edges (default: "solid")
    pub high_edge_style: &'static str,
    /// Style for zero (low) edges (default: "dotted")
    pub low_edge_style: &'static str,
    /// Place the nodes of each level in one rank (default: true)
    pub rank_by_level: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "box",
            root_shape: "box",
            high_edge_style: "solid",
            low_edge_style: "dotted",
            rank_by_level: true,
        }
    }
}

/// Serialized form of a [`Bdd`], see the module documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDump {
    pub root: usize,
    pub zero_node: usize,
    pub one_node: usize,
    pub nodes: Vec<NodeDump>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub variable: String,
    pub zero_child: Option<usize>,
    pub one_child: Option<usize>,
}

impl Bdd {
    fn label(&self, r: Ref) -> String {
        match self.variable(r) {
            Some(var) => self.name(var).to_string(),
            None if self.is_one(r) => "1".to_string(),
            None => "0".to_string(),
        }
    }

    /// Converts the reachable part of the diagram to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the reachable part of the diagram to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "node0 [label=\"0\", shape={}];", config.terminal_shape)?;
        writeln!(dot, "node1 [label=\"1\", shape={}];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let reachable: Vec<Ref> = self.descendants().into_iter().filter(|r| !r.is_terminal()).collect();

        let mut levels = BTreeMap::<usize, Vec<Ref>>::new();
        for &r in &reachable {
            levels.entry(self.level(r).index()).or_default().push(r);
        }
        for level in levels.values() {
            if config.rank_by_level {
                writeln!(dot, "{{ rank=same")?;
            }
            for &r in level {
                writeln!(dot, "node{} [label=\"{}\"];", r.index(), self.label(r))?;
            }
            if config.rank_by_level {
                writeln!(dot, "}}")?;
            }
        }

        for &r in &reachable {
            writeln!(
                dot,
                "node{} -> node{} [style={}];",
                r.index(),
                self.low(r).index(),
                config.low_edge_style
            )?;
            writeln!(
                dot,
                "node{} -> node{} [style={}];",
                r.index(),
                self.high(r).index(),
                config.high_edge_style
            )?;
        }

        writeln!(dot, "name [label=\"f\", shape={}];", config.root_shape)?;
        writeln!(dot, "name -> node{};", self.root().index())?;
        writeln!(dot, "}}")?;
        Ok(dot)
    }

    pub fn to_dump(&self) -> DiagramDump {
        let nodes = (0..self.size())
            .map(|i| {
                let r = Ref::new(i as u32);
                let children = (!r.is_terminal()).then(|| (self.low(r).index(), self.high(r).index()));
                NodeDump {
                    variable: self.label(r),
                    zero_child: children.map(|(low, _)| low),
                    one_child: children.map(|(_, high)| high),
                }
            })
            .collect();
        DiagramDump {
            root: self.root().index(),
            zero_node: Ref::ZERO.index(),
            one_node: Ref::ONE.index(),
            nodes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_dump())
    }
}
