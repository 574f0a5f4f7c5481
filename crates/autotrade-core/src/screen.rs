//! Screen (subscription channel) number allocation.
//!
//! The broker transport multiplexes subscriptions and request/response
//! pairs by screen number. Numbers are handed out from a fixed band and
//! recycled cyclically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest screen number of the default band.
pub const DEFAULT_SCREEN_BASE: u16 = 5000;

/// Highest screen number of the default band.
pub const DEFAULT_SCREEN_MAX: u16 = 5150;

/// Opaque screen number handed to the broker transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(pub u16);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cyclic screen number generator.
///
/// Each call increments the counter; once the result would exceed `max`
/// the counter restarts at `base`. Starting from `base`, the sequence is
/// `base+1 ..= max, base, base+1, ...`.
#[derive(Debug, Clone)]
pub struct ScreenNumberAllocator {
    current: u16,
    base: u16,
    max: u16,
}

impl ScreenNumberAllocator {
    /// Create an allocator over `base..=max`.
    ///
    /// `max` is clamped to be at least `base`.
    #[must_use]
    pub fn new(base: u16, max: u16) -> Self {
        Self {
            current: base,
            base,
            max: max.max(base),
        }
    }

    /// Next screen number.
    pub fn next(&mut self) -> ScreenId {
        self.current = match self.current.checked_add(1) {
            Some(n) if n <= self.max => n,
            _ => self.base,
        };
        ScreenId(self.current)
    }
}

impl Default for ScreenNumberAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_SCREEN_BASE, DEFAULT_SCREEN_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_starts_above_base() {
        let mut alloc = ScreenNumberAllocator::default();
        assert_eq!(alloc.next(), ScreenId(5001));
        assert_eq!(alloc.next(), ScreenId(5002));
    }

    #[test]
    fn test_wraps_to_base_after_max() {
        let mut alloc = ScreenNumberAllocator::default();
        let issued: Vec<_> = (0..151).map(|_| alloc.next()).collect();
        assert_eq!(issued[149], ScreenId(5150));
        assert_eq!(issued[150], ScreenId(5000));
        assert_eq!(alloc.next(), ScreenId(5001));
    }

    #[test]
    fn test_stays_in_band() {
        let mut alloc = ScreenNumberAllocator::new(10, 12);
        let issued: Vec<u16> = (0..8).map(|_| alloc.next().0).collect();
        assert_eq!(issued, vec![11, 12, 10, 11, 12, 10, 11, 12]);
    }
}
