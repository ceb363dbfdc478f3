//! Error type shared by the formula engine, the diagram builders and the mapper.

use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Formula evaluation reached a variable missing from the assignment.
    UnboundVariable { name: String },
    /// Diagram construction exceeded the configured node limit.
    ///
    /// This is the only recoverable error: the order search treats it as
    /// "try the next order" and never lets it reach the caller.
    CutoffReached { limit: usize },
    /// Every candidate order was abandoned, so no diagram exists to map.
    NoDiagram { output: String },
    /// The variable order handed to a builder does not fit the formula.
    InvalidOrder { message: String },
    /// Cube expansion supports at most `limit` LUT inputs.
    LutTooLarge { inputs: usize, limit: usize },
    /// No configured physical LUT size can hold the given number of inputs.
    NoLutSize { inputs: usize },
    /// A LUT formula depends on a wire that is not among its inputs.
    UnresolvedLutFormula { output: String },
    /// Malformed formula or network text.
    Parse { line: usize, column: usize, message: String },
    UndefinedWire { name: String },
    CombinationalLoop { name: String },
    Io(std::io::Error),
    Fmt(std::fmt::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnboundVariable { name } => {
                write!(f, "Variable assignment does not contain value for '{}'", name)
            }
            Error::CutoffReached { limit } => write!(f, "BDD size cutoff of {} nodes reached", limit),
            Error::NoDiagram { output } => {
                write!(f, "No candidate order produced a BDD within the size cutoff for '{}'", output)
            }
            Error::InvalidOrder { message } => write!(f, "Invalid variable order: {}", message),
            Error::LutTooLarge { inputs, limit } => write!(
                f,
                "LUT is too large to be converted to cubes (max {} inputs, got {})",
                limit, inputs
            ),
            Error::NoLutSize { inputs } => write!(f, "No suitable LUT type available for {} inputs", inputs),
            Error::UnresolvedLutFormula { output } => {
                write!(f, "Formula of LUT '{}' depends on wires outside its inputs", output)
            }
            Error::Parse { line, column, message } => write!(f, "{}:{}: {}", line, column, message),
            Error::UndefinedWire { name } => write!(f, "Wire '{}' is never driven", name),
            Error::CombinationalLoop { name } => write!(f, "Combinational loop through wire '{}'", name),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Fmt(e) => write!(f, "Formatting error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Fmt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::Fmt(e)
    }
}
