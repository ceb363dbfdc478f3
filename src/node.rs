use crate::reference::Ref;
use crate::types::Var;

/// Arena record of a decision node.
///
/// Terminals have no variable and point to themselves.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub variable: Option<Var>,
    pub low: Ref,
    pub high: Ref,
}

impl Node {
    pub fn new(variable: Var, low: Ref, high: Ref) -> Self {
        Self {
            variable: Some(variable),
            low,
            high,
        }
    }

    pub fn terminal(value: bool) -> Self {
        let r = Ref::terminal(value);
        Self {
            variable: None,
            low: r,
            high: r,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.variable.is_none()
    }

    /// Child selected by `value`.
    pub fn child(&self, value: bool) -> Ref {
        if value {
            self.high
        } else {
            self.low
        }
    }
}
