//! Reading and writing gate networks in BLIF.
//!
//! The reader understands the combinational subset produced by common synthesis tools:
//!
//! - `.model` and `.wire_load_slope` are ignored
//! - `.inputs` / `.outputs` declare primary wires (repeatable)
//! - `.latch in out ...` is cut open: `in` becomes a primary output, `out` a primary input
//! - `.names a b ... out` followed by on-set rows such as `1-0 1`; a gate without inputs is
//!   the constant given by its single row (`1`), or false when it has none
//! - `#` starts a comment, a trailing `\` continues the line
//! - reading stops at the first `.end`
//!
//! Every output is translated into a [`Formula`] over the primary inputs. Each internal wire
//! is translated once and its (constant-folded) formula is shared by all readers.
//!
//! The writer emits one `.names` block per [`Lut`], padded with a placeholder wire up to the
//! smallest configured physical LUT size.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::lut::Lut;

/// A combinational network: primary inputs and one formula per primary output.
#[derive(Debug, Clone, Default)]
pub struct BlifNetwork {
    pub model: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<(String, Formula)>,
}

impl BlifNetwork {
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[derive(Debug)]
struct Gate {
    line: usize,
    inputs: Vec<String>,
    rows: Vec<(usize, String)>,
}

/// Comment-free logical lines with continuations resolved, tagged with their first line number.
fn logical_lines(text: &str) -> Result<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    let mut buffer: Option<(usize, String)> = None;

    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() && buffer.is_none() {
            continue;
        }
        let (start, mut line) = buffer.take().unwrap_or((number, String::new()));
        match content.strip_suffix('\\') {
            Some(head) => {
                line.push_str(head.trim_end());
                line.push(' ');
                buffer = Some((start, line));
            }
            None => {
                line.push_str(content);
                lines.push((start, line));
            }
        }
    }

    if let Some((start, _)) = buffer {
        return Err(Error::parse(
            start,
            1,
            "expected line continuation after '\\' but got end of input",
        ));
    }
    Ok(lines)
}

/// Parses BLIF text into a network of output formulas.
pub fn parse_blif(text: &str) -> Result<BlifNetwork> {
    let lines = logical_lines(text)?;
    let mut network = BlifNetwork::default();
    let mut output_names: Vec<String> = Vec::new();
    let mut gates: HashMap<String, Gate> = HashMap::new();

    let mut i = 0;
    while i < lines.len() {
        let (number, line) = &lines[i];
        i += 1;
        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };
        match directive {
            ".names" => {
                let mut wires: Vec<String> = tokens.map(str::to_string).collect();
                let Some(output) = wires.pop() else {
                    return Err(Error::parse(*number, 1, "'.names' without an output wire"));
                };
                let mut rows = Vec::new();
                while i < lines.len() && !lines[i].1.starts_with('.') {
                    rows.push(lines[i].clone());
                    i += 1;
                }
                gates.insert(
                    output,
                    Gate {
                        line: *number,
                        inputs: wires,
                        rows,
                    },
                );
            }
            ".inputs" => network.inputs.extend(tokens.map(str::to_string)),
            ".outputs" => output_names.extend(tokens.map(str::to_string)),
            ".latch" => {
                let parts: Vec<&str> = tokens.collect();
                if parts.len() < 2 {
                    return Err(Error::parse(*number, 1, "'.latch' needs an input and an output wire"));
                }
                output_names.push(parts[0].to_string());
                network.inputs.push(parts[1].to_string());
            }
            ".model" => network.model = Some(tokens.collect::<Vec<_>>().join(" ")),
            ".wire_load_slope" => {}
            ".end" => break,
            other => {
                return Err(Error::parse(*number, 1, format!("unrecognized command '{}'", other)));
            }
        }
    }

    debug!(
        "BLIF: {} inputs, {} outputs, {} gates",
        network.inputs.len(),
        output_names.len(),
        gates.len()
    );

    let mut translator = Translator {
        inputs: network.inputs.iter().map(String::as_str).collect(),
        gates: &gates,
        cache: HashMap::new(),
        visiting: HashSet::new(),
    };
    let mut outputs = Vec::with_capacity(output_names.len());
    for name in output_names {
        let formula = translator.wire(&name)?;
        outputs.push((name, formula));
    }
    network.outputs = outputs;
    Ok(network)
}

pub fn read_blif(path: impl AsRef<Path>) -> Result<BlifNetwork> {
    let text = fs::read_to_string(path)?;
    parse_blif(&text)
}

struct Translator<'a> {
    inputs: HashSet<&'a str>,
    gates: &'a HashMap<String, Gate>,
    cache: HashMap<String, Formula>,
    visiting: HashSet<String>,
}

impl Translator<'_> {
    fn wire(&mut self, name: &str) -> Result<Formula> {
        if let Some(f) = self.cache.get(name) {
            return Ok(f.clone());
        }
        if self.inputs.contains(name) {
            let f = Formula::var(name);
            self.cache.insert(name.to_string(), f.clone());
            return Ok(f);
        }

        let gates = self.gates;
        let gate = gates.get(name).ok_or_else(|| Error::UndefinedWire { name: name.to_string() })?;
        if !self.visiting.insert(name.to_string()) {
            return Err(Error::CombinationalLoop { name: name.to_string() });
        }

        let formula = if gate.inputs.is_empty() {
            self.constant(gate)?
        } else {
            let mut terms = Vec::with_capacity(gate.rows.len());
            for (number, row) in &gate.rows {
                terms.push(self.row(&gate.inputs, *number, row)?);
            }
            Formula::disjunction(terms).fold_constants()
        };

        self.visiting.remove(name);
        self.cache.insert(name.to_string(), formula.clone());
        Ok(formula)
    }

    fn constant(&self, gate: &Gate) -> Result<Formula> {
        match gate.rows.first() {
            None => Ok(Formula::ff()),
            Some((_, row)) if row.trim() == "1" => Ok(Formula::tt()),
            Some((_, row)) if row.trim() == "0" => Ok(Formula::ff()),
            Some((number, row)) => Err(Error::parse(
                *number,
                1,
                format!("malformed constant row '{}' (gate at line {})", row, gate.line),
            )),
        }
    }

    /// Conjunction of the literals of one on-set row.
    fn row(&mut self, inputs: &[String], number: usize, row: &str) -> Result<Formula> {
        let fields: Vec<&str> = row.split_whitespace().collect();
        let &[pattern, value] = fields.as_slice() else {
            return Err(Error::parse(number, 1, format!("malformed row '{}'", row)));
        };
        if value != "1" {
            return Err(Error::parse(
                number,
                pattern.len() + 2,
                "only on-set rows (output '1') are supported",
            ));
        }
        if pattern.chars().count() != inputs.len() {
            return Err(Error::parse(
                number,
                1,
                format!("row '{}' does not match {} gate inputs", pattern, inputs.len()),
            ));
        }

        let mut literals = Vec::new();
        for (column, (c, input)) in pattern.chars().zip(inputs).enumerate() {
            match c {
                '1' => literals.push(self.wire(input)?),
                '0' => literals.push(Formula::mk_not(self.wire(input)?)),
                '-' => {}
                _ => {
                    return Err(Error::parse(
                        number,
                        column + 1,
                        format!("unexpected character '{}' in row", c),
                    ))
                }
            }
        }
        Ok(Formula::conjunction(literals))
    }
}

/// Output settings for [`write_blif`].
#[derive(Debug, Clone)]
pub struct BlifConfig {
    /// Physical LUT sizes available; each LUT is padded to the smallest one that fits.
    pub lut_sizes: Vec<usize>,
    /// Wire used for padding, driven by a constant zero when used.
    pub placeholder: String,
    pub model: String,
}

impl Default for BlifConfig {
    fn default() -> Self {
        Self {
            lut_sizes: vec![5],
            placeholder: "__pad".to_string(),
            model: "Mapped".to_string(),
        }
    }
}

/// Writes a mapped network, one `.names` block per LUT.
pub fn write_blif<W: Write>(
    writer: &mut W,
    inputs: &[String],
    outputs: &[String],
    luts: &[Lut],
    config: &BlifConfig,
) -> Result<()> {
    writeln!(writer, ".model {}", config.model)?;
    writeln!(writer, ".inputs {}", inputs.join(" "))?;
    writeln!(writer, ".outputs {}", outputs.join(" "))?;

    let mut padded = false;
    for lut in luts {
        let size = config
            .lut_sizes
            .iter()
            .copied()
            .filter(|&s| s >= lut.fan_in())
            .min()
            .ok_or(Error::NoLutSize { inputs: lut.fan_in() })?;
        let cubes = lut.cubes()?;

        let mut wires: Vec<&str> = lut.inputs().iter().map(String::as_str).collect();
        wires.extend(std::iter::repeat(config.placeholder.as_str()).take(size - lut.fan_in()));
        padded |= size > lut.fan_in();
        wires.push(lut.output());

        writeln!(writer, ".names {}", wires.join(" "))?;
        for cube in cubes {
            writeln!(writer, "{} 1", lut.cube_line(cube, size))?;
        }
    }

    if padded {
        writeln!(writer, ".names {}", config.placeholder)?;
    }
    writeln!(writer, ".end")?;
    Ok(())
}

/// [`write_blif`] into a string.
pub fn to_blif_string(inputs: &[String], outputs: &[String], luts: &[Lut], config: &BlifConfig) -> Result<String> {
    let mut buffer = Vec::new();
    write_blif(&mut buffer, inputs, outputs, luts, config)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::formula::tests::assignments;
    use crate::formula::Expr;
    use crate::lut::simulate;
    use crate::parser::parse_formula;

    const FULL_ADDER: &str = "\
# a one-bit full adder
.model adder
.inputs a b \\
  cin
.outputs sum cout
.names a b t
10 1
01 1
.names t cin sum
10 1
01 1
.names a b cin cout
11- 1
1-1 1
-11 1
.end
.names ignored
1
";

    #[test]
    fn test_parse_full_adder() {
        let network = parse_blif(FULL_ADDER).unwrap();
        assert_eq!(network.model.as_deref(), Some("adder"));
        assert_eq!(network.inputs, vec!["a", "b", "cin"]);
        assert_eq!(network.output_names(), vec!["sum", "cout"]);
        for assignment in assignments(&["a", "b", "cin"]) {
            let (a, b, c) = (assignment["a"], assignment["b"], assignment["cin"]);
            assert_eq!(network.outputs[0].1.eval(&assignment).unwrap(), a ^ b ^ c);
            assert_eq!(
                network.outputs[1].1.eval(&assignment).unwrap(),
                (a && b) || (a && c) || (b && c)
            );
        }
    }

    #[test]
    fn test_internal_wires_are_shared() {
        let text = ".inputs a b c\n.outputs x y\n.names a b t\n11 1\n.names t c x\n1- 1\n.names t c y\n-1 1\n1- 1\n";
        let network = parse_blif(text).unwrap();
        let t = &network.outputs[0].1;
        assert_eq!(t.to_string(), "(a & b)");
        // y = c | t reuses the translation of t
        let Expr::Or(left, right) = network.outputs[1].1.expr() else {
            panic!("expected a disjunction");
        };
        assert!(matches!(left.expr(), Expr::Var(name) if name == "c"));
        assert!(right.ptr_eq(t));
    }

    #[test]
    fn test_latches_and_constants() {
        let text = ".inputs a\n.outputs o k z\n.latch n q re clk 0\n.names a q n\n11 1\n.names q o\n0 1\n.names k\n1\n.names z\n";
        let network = parse_blif(text).unwrap();
        assert_eq!(network.inputs, vec!["a", "q"]);
        assert_eq!(network.output_names(), vec!["o", "k", "z", "n"]);
        assert_eq!(network.outputs[1].1.as_const(), Some(true));
        assert_eq!(network.outputs[2].1.as_const(), Some(false));
        assert_eq!(network.outputs[3].1.to_string(), "(a & q)");
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ".inputs a\n.outputs o\n.gate and2 a=a O=o\n",
            ".inputs a\n.outputs o\n.names a o\n1 0\n",
            ".inputs a\n.outputs o\n.names a o\n11 1\n",
            ".inputs a\n.outputs o\n.names a o\nx 1\n",
            ".inputs a \\\n",
        ];
        for text in cases {
            assert!(matches!(parse_blif(text), Err(Error::Parse { .. })), "{:?}", text);
        }
        match parse_blif(".inputs a\n.outputs o\n.gate x\n") {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_undefined_wire_and_loop() {
        let undefined = ".inputs a\n.outputs o\n.names a w o\n11 1\n";
        assert!(matches!(parse_blif(undefined), Err(Error::UndefinedWire { name }) if name == "w"));
        let looped = ".inputs a\n.outputs o\n.names a p o\n11 1\n.names o p\n1 1\n";
        assert!(matches!(parse_blif(looped), Err(Error::CombinationalLoop { .. })));
    }

    #[test]
    fn test_write_blif() {
        let luts = vec![
            Lut::new(
                vec!["a".to_string(), "b".to_string()],
                "t",
                parse_formula("a & !b").unwrap(),
            ),
            Lut::new(
                vec!["t".to_string(), "c".to_string(), "d".to_string(), "e".to_string(), "f".to_string()],
                "o",
                parse_formula("t | c").unwrap(),
            ),
        ];
        let inputs: Vec<String> = ["a", "b", "c", "d", "e", "f"].iter().map(|s| s.to_string()).collect();
        let text = to_blif_string(&inputs, &["o".to_string()], &luts, &BlifConfig::default()).unwrap();
        let expected = "\
.model Mapped
.inputs a b c d e f
.outputs o
.names a b __pad __pad __pad t
10--- 1
.names t c d e f o
1---- 1
01--- 1
.names __pad
.end
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_write_blif_lut_sizes() {
        let lut = Lut::new(
            (0..6).map(|i| format!("x{}", i)).collect(),
            "o",
            Formula::var("x0"),
        );
        let result = to_blif_string(&[], &[], &[lut.clone()], &BlifConfig::default());
        assert!(matches!(result, Err(Error::NoLutSize { inputs: 6 })));

        let config = BlifConfig {
            lut_sizes: vec![4, 6],
            ..BlifConfig::default()
        };
        let text = to_blif_string(&[], &[], &[lut], &config).unwrap();
        assert!(!text.contains("__pad"));
    }

    #[test]
    fn test_written_network_reads_back() {
        let luts = vec![
            Lut::new(vec!["a".to_string(), "b".to_string()], "t", parse_formula("a <=> b").unwrap()),
            Lut::new(vec!["t".to_string(), "c".to_string()], "o", parse_formula("t ^ c").unwrap()),
        ];
        let inputs: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let text = to_blif_string(&inputs, &["o".to_string()], &luts, &BlifConfig::default()).unwrap();
        let network = parse_blif(&text).unwrap();
        assert_eq!(network.inputs, inputs);
        for assignment in assignments(&["a", "b", "c"]) {
            let wires = simulate(&luts, &assignment).unwrap();
            assert_eq!(network.outputs[0].1.eval(&assignment).unwrap(), wires["o"]);
        }
    }
}
