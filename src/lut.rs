//! Lookup tables produced by the mapper, and their truth tables.
//!
//! A [`Lut`] keeps the formula it emulates over its ordered input wires. The on-set is
//! obtained on demand by [`Lut::cubes`]: the formula is simplified one input at a time (in
//! input order) until every branch folds to a constant. Each cube is a `u32` holding two bits
//! per input position `j`, at `2j` and `2j + 1`:
//!
//! | bits | meaning          | BLIF |
//! |------|------------------|------|
//! | `10` | input must be 1  | `1`  |
//! | `01` | input must be 0  | `0`  |
//! | `11` | don't care       | `-`  |
//!
//! which limits cube expansion to [`MAX_CUBE_INPUTS`] inputs.

use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};
use crate::formula::Formula;

/// Widest LUT that [`Lut::cubes`] can encode.
pub const MAX_CUBE_INPUTS: usize = 16;

const MUST_BE_ONE: u32 = 0b10;
const MUST_BE_ZERO: u32 = 0b01;

#[derive(Debug, Clone)]
pub struct Lut {
    inputs: Vec<String>,
    output: String,
    formula: Formula,
}

impl Lut {
    pub fn new(inputs: Vec<String>, output: impl Into<String>, formula: Formula) -> Self {
        Self {
            inputs,
            output: output.into(),
            formula,
        }
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn fan_in(&self) -> usize {
        self.inputs.len()
    }

    /// On-set of the LUT as a list of cubes.
    ///
    /// `False` branches are dropped and `True` branches emit one cube. An input on which a
    /// branch does not depend (both cofactors syntactically equal) stays a don't-care.
    pub fn cubes(&self) -> Result<Vec<u32>> {
        if self.inputs.len() > MAX_CUBE_INPUTS {
            return Err(Error::LutTooLarge {
                inputs: self.inputs.len(),
                limit: MAX_CUBE_INPUTS,
            });
        }

        let mut queue = VecDeque::from([(self.formula.clone(), 0usize, u32::MAX)]);
        let mut on_set = Vec::new();

        while let Some((formula, index, cube)) = queue.pop_front() {
            match formula.as_const() {
                Some(false) => continue,
                Some(true) => {
                    on_set.push(cube);
                    continue;
                }
                None => {}
            }
            let Some(input) = self.inputs.get(index) else {
                return Err(Error::UnresolvedLutFormula {
                    output: self.output.clone(),
                });
            };
            let one = formula.simplify(input, true);
            let zero = formula.simplify(input, false);
            if one.syn_eq(&zero) {
                queue.push_back((one, index + 1, cube));
            } else {
                queue.push_back((one, index + 1, cube & !(MUST_BE_ZERO << (2 * index))));
                queue.push_back((zero, index + 1, cube & !(MUST_BE_ONE << (2 * index))));
            }
        }

        Ok(on_set)
    }

    /// Renders one cube as a BLIF input pattern over `width` columns; columns beyond the
    /// LUT's own inputs are don't-cares.
    pub fn cube_line(&self, cube: u32, width: usize) -> String {
        (0..width)
            .map(|j| {
                if j >= self.inputs.len() {
                    return '-';
                }
                match (cube >> (2 * j)) & 0b11 {
                    MUST_BE_ONE => '1',
                    MUST_BE_ZERO => '0',
                    _ => '-',
                }
            })
            .collect()
    }
}

impl Display for Lut {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LUT({})->{}", self.inputs.join(", "), self.output)
    }
}

fn cube_matches(cube: u32, values: impl Iterator<Item = bool>) -> bool {
    values.enumerate().all(|(j, value)| {
        let required = if value { MUST_BE_ONE } else { MUST_BE_ZERO };
        (cube >> (2 * j)) & required != 0
    })
}

/// A list of LUTs with their truth tables expanded, ready for simulation.
#[derive(Debug, Clone)]
pub struct LutNetwork {
    luts: Vec<(Lut, Vec<u32>)>,
}

impl LutNetwork {
    pub fn new(luts: &[Lut]) -> Result<Self> {
        let luts = luts
            .iter()
            .map(|lut| Ok((lut.clone(), lut.cubes()?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { luts })
    }

    pub fn len(&self) -> usize {
        self.luts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }

    /// Evaluates the LUTs in order, each one reading only its truth table.
    ///
    /// Returns the values of all wires, primary inputs included. Reading a wire that is
    /// neither a primary input nor driven by an earlier LUT is an error, so a successful
    /// simulation also shows that the list is in topological order.
    pub fn simulate(&self, inputs: &HashMap<String, bool>) -> Result<HashMap<String, bool>> {
        let mut wires = inputs.clone();
        for (lut, cubes) in &self.luts {
            let values = lut
                .inputs()
                .iter()
                .map(|name| {
                    wires
                        .get(name)
                        .copied()
                        .ok_or_else(|| Error::UndefinedWire { name: name.clone() })
                })
                .collect::<Result<Vec<bool>>>()?;
            let value = cubes.iter().any(|&cube| cube_matches(cube, values.iter().copied()));
            wires.insert(lut.output().to_string(), value);
        }
        Ok(wires)
    }
}

/// One-shot simulation of `luts` under the primary input values `inputs`.
pub fn simulate(luts: &[Lut], inputs: &HashMap<String, bool>) -> Result<HashMap<String, bool>> {
    LutNetwork::new(luts)?.simulate(inputs)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::formula::tests::assignments;
    use crate::parser::parse_formula;

    fn lut(inputs: &[&str], output: &str, formula: &str) -> Lut {
        Lut::new(
            inputs.iter().map(|s| s.to_string()).collect(),
            output,
            parse_formula(formula).unwrap(),
        )
    }

    #[test]
    fn test_cubes_and() {
        let l = lut(&["a", "b"], "o", "a & b");
        let cubes = l.cubes().unwrap();
        assert_eq!(cubes.len(), 1);
        assert_eq!(l.cube_line(cubes[0], 5), "11---");
    }

    #[test]
    fn test_cubes_or_keeps_dont_cares() {
        let l = lut(&["a", "b"], "o", "a | b");
        let lines: Vec<String> = l.cubes().unwrap().iter().map(|&c| l.cube_line(c, 2)).collect();
        assert_eq!(lines, vec!["1-", "01"]);
    }

    #[test]
    fn test_cubes_constant() {
        let l = Lut::new(vec![], "t", Formula::tt());
        assert_eq!(l.cubes().unwrap(), vec![u32::MAX]);
        assert_eq!(l.cube_line(u32::MAX, 3), "---");
        let l = Lut::new(vec!["a".to_string()], "f", Formula::ff());
        assert!(l.cubes().unwrap().is_empty());
    }

    #[test]
    fn test_cubes_errors() {
        let l = lut(&["a"], "o", "a & b");
        assert!(matches!(l.cubes(), Err(Error::UnresolvedLutFormula { .. })));

        let inputs: Vec<String> = (0..17).map(|i| format!("x{}", i)).collect();
        let l = Lut::new(inputs, "o", Formula::var("x0"));
        assert!(matches!(l.cubes(), Err(Error::LutTooLarge { inputs: 17, limit: 16 })));
    }

    #[test]
    fn test_cubes_match_formula() {
        let vars = ["a", "b", "c", "d"];
        for text in ["a <=> (b | !c)", "(a & b) | (c & d) | !a", "a ^ b ^ c ^ d", "false | a"] {
            let l = lut(&vars, "o", text);
            let network = LutNetwork::new(&[l.clone()]).unwrap();
            for assignment in assignments(&vars) {
                let wires = network.simulate(&assignment).unwrap();
                assert_eq!(wires["o"], l.formula().eval(&assignment).unwrap(), "{}", text);
            }
        }
    }

    #[test]
    fn test_simulate_chain() {
        let luts = vec![lut(&["a", "b"], "t", "a ^ b"), lut(&["t", "c"], "o", "t & c")];
        for assignment in assignments(&["a", "b", "c"]) {
            let wires = simulate(&luts, &assignment).unwrap();
            let expected = (assignment["a"] ^ assignment["b"]) && assignment["c"];
            assert_eq!(wires["o"], expected);
        }
    }

    #[test]
    fn test_simulate_rejects_undriven_wire() {
        let luts = vec![lut(&["t", "c"], "o", "t & c"), lut(&["a"], "t", "a")];
        let inputs = HashMap::from([("a".to_string(), true), ("c".to_string(), true)]);
        match simulate(&luts, &inputs) {
            Err(Error::UndefinedWire { name }) => assert_eq!(name, "t"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(lut(&["a", "b"], "o", "a").to_string(), "LUT(a, b)->o");
    }
}
