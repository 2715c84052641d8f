//! Terminal addressing

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one virtual terminal
///
/// Viewers send indices as signed integers; conversion through
/// [`TerminalIndex::new`] is the only way to build one from untrusted input,
/// so a negative index never reaches the server core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalIndex(u32);

/// Error returned for indices outside `0..=u32::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid terminal index {0}: must be between 0 and {max}", max = u32::MAX)]
pub struct InvalidTerminalIndex(pub i64);

impl TerminalIndex {
    /// Validate a raw index
    pub fn new(raw: i64) -> Result<Self, InvalidTerminalIndex> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| InvalidTerminalIndex(raw))
    }

    /// Get the raw value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for TerminalIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for TerminalIndex {
    type Error = InvalidTerminalIndex;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<TerminalIndex> for i64 {
    fn from(index: TerminalIndex) -> Self {
        i64::from(index.0)
    }
}

impl fmt::Display for TerminalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tty{}", self.0)
    }
}

/// Per-resolver identifier of an outstanding read request
///
/// Only unique among the requests currently held by one resolver.
pub type RequestId = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_zero_and_positive() {
        assert_eq!(TerminalIndex::new(0).unwrap().value(), 0);
        assert_eq!(TerminalIndex::new(42).unwrap().value(), 42);
    }

    #[test]
    fn test_new_rejects_negative() {
        let err = TerminalIndex::new(-1).unwrap_err();
        assert_eq!(err, InvalidTerminalIndex(-1));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn test_new_rejects_overflow() {
        assert!(TerminalIndex::new(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TerminalIndex::from(3).to_string(), "tty3");
    }

    #[test]
    fn test_ordering_follows_value() {
        let mut indices = vec![TerminalIndex::from(5), TerminalIndex::from(1), TerminalIndex::from(3)];
        indices.sort();
        assert_eq!(
            indices.iter().map(|i| i.value()).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
    }
}
