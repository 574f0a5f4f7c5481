//! Realtime tick subscriptions.

use std::collections::BTreeSet;

use autotrade_core::Symbol;

/// Symbols registered for realtime trade ticks.
///
/// Registration is requested at most once per symbol for the life of the
/// session.
#[derive(Debug, Default, Clone)]
pub struct RealtimeRegistry {
    symbols: BTreeSet<Symbol>,
}

impl RealtimeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `symbol` registered. Returns `true` if it was not yet.
    pub fn register(&mut self, symbol: &Symbol) -> bool {
        self.symbols.insert(symbol.clone())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_once() {
        let mut registry = RealtimeRegistry::new();
        let symbol = Symbol::new("005930");
        assert!(registry.register(&symbol));
        assert!(!registry.register(&symbol));
        assert!(registry.contains(&symbol));
        assert_eq!(registry.len(), 1);
    }
}
