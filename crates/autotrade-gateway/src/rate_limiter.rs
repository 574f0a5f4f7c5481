//! Rate limiting for broker requests.
//!
//! The broker caps request throughput on several windows at once
//! (per second, per minute, per hour). The limiter keeps one ledger of
//! send timestamps and checks each tier with a fixed-offset lookback:
//! a send is denied when the n-th most recent send of a tier with limit
//! n still lies inside that tier's window. At most n sends therefore
//! fall in any window of the tier's length.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// One throughput ceiling: at most `max_sends` sends per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub max_sends: usize,
    pub window_ms: u64,
}

impl RateTier {
    #[must_use]
    pub const fn new(max_sends: usize, window_ms: u64) -> Self {
        Self {
            max_sends,
            window_ms,
        }
    }
}

/// Default broker tiers: 4/s, 55/min, 950/h.
pub const DEFAULT_TIERS: [RateTier; 3] = [
    RateTier::new(4, 1_000),
    RateTier::new(55, 60_000),
    RateTier::new(950, 3_600_000),
];

/// Multi-window send limiter over a bounded timestamp ledger.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tiers: Vec<RateTier>,
    /// Send timestamps, oldest first.
    ledger: VecDeque<u64>,
    /// Largest tier limit; the ledger never holds more entries.
    capacity: usize,
}

impl RateLimiter {
    /// Create a limiter. Tiers with `max_sends == 0` are ignored.
    #[must_use]
    pub fn new(tiers: Vec<RateTier>) -> Self {
        let tiers: Vec<RateTier> = tiers.into_iter().filter(|t| t.max_sends > 0).collect();
        let capacity = tiers.iter().map(|t| t.max_sends).max().unwrap_or(0);
        Self {
            tiers,
            ledger: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Whether a send at `now_ms` is admitted. Never mutates.
    pub fn can_send(&self, now_ms: u64) -> bool {
        let len = self.ledger.len();
        self.tiers.iter().all(|tier| {
            if len < tier.max_sends {
                return true;
            }
            let nth_recent = self.ledger[len - tier.max_sends];
            let admitted = now_ms.saturating_sub(nth_recent) >= tier.window_ms;
            if !admitted {
                trace!(
                    max_sends = tier.max_sends,
                    window_ms = tier.window_ms,
                    "Rate tier saturated"
                );
            }
            admitted
        })
    }

    /// Record a send at `now_ms`, evicting the oldest entry on overflow.
    pub fn record(&mut self, now_ms: u64) {
        if self.capacity == 0 {
            return;
        }
        self.ledger.push_back(now_ms);
        while self.ledger.len() > self.capacity {
            self.ledger.pop_front();
        }
    }

    /// Number of timestamps retained.
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_TIERS.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger_admits() {
        let limiter = RateLimiter::default();
        assert!(limiter.can_send(0));
    }

    #[test]
    fn test_fifth_send_within_second_denied() {
        let mut limiter = RateLimiter::default();
        for t in [0, 100, 200, 300] {
            assert!(limiter.can_send(t));
            limiter.record(t);
        }
        assert!(!limiter.can_send(400));
        assert!(!limiter.can_send(999));
        assert!(limiter.can_send(1_000));
    }

    #[test]
    fn test_denial_does_not_mutate() {
        let mut limiter = RateLimiter::default();
        for t in [0, 1, 2, 3] {
            limiter.record(t);
        }
        let before = limiter.ledger_len();
        for t in 4..50 {
            assert!(!limiter.can_send(t));
        }
        assert_eq!(limiter.ledger_len(), before);
    }

    #[test]
    fn test_minute_tier() {
        let mut limiter = RateLimiter::default();
        let mut now = 0;
        let mut sent = 0;
        while now < 60_000 {
            if limiter.can_send(now) {
                limiter.record(now);
                sent += 1;
            }
            now += 10;
        }
        assert_eq!(sent, 55);
    }

    #[test]
    fn test_window_property_holds_under_saturation() {
        let tiers = vec![RateTier::new(3, 100), RateTier::new(5, 1_000)];
        let mut limiter = RateLimiter::new(tiers.clone());
        let mut sent = Vec::new();
        for now in (0..5_000).step_by(7) {
            if limiter.can_send(now) {
                limiter.record(now);
                sent.push(now);
            }
        }
        assert!(!sent.is_empty());
        for tier in &tiers {
            for &start in &sent {
                let in_window = sent
                    .iter()
                    .filter(|&&t| t >= start && t < start + tier.window_ms)
                    .count();
                assert!(in_window <= tier.max_sends);
            }
        }
    }

    #[test]
    fn test_ledger_bounded_by_largest_tier() {
        let mut limiter = RateLimiter::new(vec![RateTier::new(2, 10), RateTier::new(4, 100)]);
        for t in 0..100 {
            limiter.record(t * 1_000);
        }
        assert_eq!(limiter.ledger_len(), 4);
    }
}
