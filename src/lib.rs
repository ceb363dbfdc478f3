//! # bdd-lutmap: LUT mapping through Binary Decision Diagrams
//!
//! **`bdd-lutmap`** maps Boolean functions onto networks of *K*-input lookup tables (LUTs),
//! the logic cells of FPGAs. Every function is turned into a quasi-reduced BDD, and the
//! diagram is cut horizontally: the part above a cut becomes a compact *select signal* that
//! addresses the nodes at the cut, and the part below is packed level by level into LUTs.
//!
//! ## Pipeline
//!
//! 1. Parse a formula ([`parser`]) or a BLIF network ([`blif`]).
//! 2. Derive candidate variable orders from formula statistics ([`order`]).
//! 3. Build a diagram for each order ([`builder`]) and reduce it ([`reduce`]).
//! 4. Sift the best one ([`reorder`]).
//! 5. Cut and pack it into LUTs ([`mapper`], using the path conditions of [`paths`]).
//! 6. Expand the LUTs into truth tables and write BLIF ([`lut`], [`blif`]).
//!
//! ## Quasi-reduced diagrams
//!
//! Unlike a canonical ROBDD, a quasi-reduced BDD (QRBDD) keeps redundant nodes so that
//! every edge goes exactly one level down. The nodes of a level are then exactly the
//! distinct sub-functions after fixing the variables above it, which is what the select
//! signal has to encode: a level of width `w` needs `ceil(log2(w))` select bits.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bdd_lutmap::lut::simulate;
//! use bdd_lutmap::mapper::{LutMapper, Strategy};
//! use bdd_lutmap::parser::parse_formula;
//! use std::collections::HashMap;
//!
//! let f = parse_formula("(a & b) | (c ^ d) | (e <=> f) | g").unwrap();
//!
//! let mut mapper = LutMapper::with_strategy(Strategy::FuseRecurse);
//! let luts = mapper.map_formula(&f, "out").unwrap();
//! assert!(luts.iter().all(|lut| lut.fan_in() <= 5));
//!
//! let inputs: HashMap<String, bool> = f.variables().into_iter().map(|v| (v, true)).collect();
//! let wires = simulate(&luts, &inputs).unwrap();
//! assert_eq!(wires["out"], f.eval(&inputs).unwrap());
//! ```
//!
//! ## Core Components
//!
//! - **[`formula`]**: Shared formula DAG with memoized simplification.
//! - **[`bdd`]**: The diagram arena, with node storage and level bookkeeping.
//! - **[`mapper`]**: Cut selection and both packing strategies.
//! - **[`blif`]**: Network input and mapped network output.
//! - **[`dot`]**: Graphviz and JSON dumps of diagrams.

pub mod bdd;
pub mod blif;
pub mod builder;
pub mod dot;
pub mod error;
pub mod formula;
pub mod lut;
pub mod mapper;
pub mod node;
pub mod order;
pub mod parser;
pub mod paths;
pub mod reduce;
pub mod reference;
pub mod reorder;
pub mod types;
