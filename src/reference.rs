use std::fmt::{Display, Formatter};

/// Handle to a node in a [`Bdd`][crate::bdd::Bdd] arena.
///
/// Handles stay valid until the next [`collect_garbage`][crate::bdd::Bdd::collect_garbage],
/// which compacts the arena and renumbers the surviving nodes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    /// The zero terminal; always the first node of an arena.
    pub const ZERO: Ref = Ref(0);
    /// The one terminal; always the second node of an arena.
    pub const ONE: Ref = Ref(1);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn terminal(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Return the index of the reference.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 <= 1
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}
