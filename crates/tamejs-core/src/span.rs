//! Source positions carried by every node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range in the original source plus the 1-based line and
/// column of its start. Line 0 marks a position that is not known, which is
/// what generated nodes carry until the rewriter hands them the position of
/// the node they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Position for nodes with no source counterpart.
    pub fn dummy() -> Self {
        Span::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// Smallest span covering both `self` and `other`. Unknown spans are
    /// ignored.
    pub fn merge(&self, other: &Span) -> Span {
        if self.is_unknown() {
            return *other;
        }
        if other.is_unknown() {
            return *self;
        }
        let (first, _) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: first.line,
            column: first.column,
        }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_is_unknown() {
        assert!(Span::dummy().is_unknown());
        assert!(!Span::new(0, 3, 1, 1).is_unknown());
    }

    #[test]
    fn merge_keeps_start_of_earliest() {
        let a = Span::new(10, 14, 2, 3);
        let b = Span::new(2, 5, 1, 3);
        let merged = a.merge(&b);
        assert_eq!(merged, Span::new(2, 14, 1, 3));
        assert_eq!(Span::dummy().merge(&a), a);
    }
}
