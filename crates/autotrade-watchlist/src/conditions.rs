//! Condition-search predicate table.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use autotrade_core::{ConditionIndex, Symbol};

use crate::error::{WatchlistError, WatchlistResult};

/// Saved conditions, the subset registered for realtime search, and the
/// symbols admitted through them.
///
/// A symbol deregistered after its exit stays barred for the session:
/// later inclusion matches for it are refused.
#[derive(Debug, Default, Clone)]
pub struct ConditionTable {
    /// Every saved condition, index to name.
    catalog: BTreeMap<ConditionIndex, String>,
    /// Conditions registered for realtime matching.
    registered: BTreeMap<ConditionIndex, String>,
    /// Symbols admitted by a registered condition and not yet exited.
    admitted: BTreeSet<Symbol>,
    /// Symbols deregistered after an exit.
    exited: BTreeSet<Symbol>,
}

impl ConditionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the saved condition list. Returns the number of conditions.
    pub fn load(&mut self, list: Vec<(ConditionIndex, String)>) -> usize {
        self.catalog = list.into_iter().collect();
        info!(count = self.catalog.len(), "Condition list loaded");
        self.catalog.len()
    }

    /// Saved conditions as (index, name).
    pub fn catalog(&self) -> impl Iterator<Item = (&ConditionIndex, &str)> {
        self.catalog.iter().map(|(i, n)| (i, n.as_str()))
    }

    /// Look up a saved condition by name.
    pub fn resolve(&self, name: &str) -> WatchlistResult<ConditionIndex> {
        let name = name.trim();
        self.catalog
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(i, _)| i.clone())
            .ok_or_else(|| WatchlistError::InvalidCondition(name.to_string()))
    }

    /// Record a condition as registered for realtime matching.
    pub fn register(&mut self, index: ConditionIndex, name: &str) -> bool {
        let added = self.registered.insert(index.clone(), name.to_string()).is_none();
        if added {
            info!(condition = name, index = %index, "Condition registered");
        }
        added
    }

    /// Remove a registered condition by name.
    pub fn unregister(&mut self, name: &str) -> WatchlistResult<ConditionIndex> {
        let index = self.resolve(name)?;
        if self.registered.remove(&index).is_none() {
            return Err(WatchlistError::NotRegistered(name.trim().to_string()));
        }
        info!(condition = name, index = %index, "Condition unregistered");
        Ok(index)
    }

    pub fn is_registered(&self, index: &ConditionIndex) -> bool {
        self.registered.contains_key(index)
    }

    pub fn registered(&self) -> impl Iterator<Item = (&ConditionIndex, &str)> {
        self.registered.iter().map(|(i, n)| (i, n.as_str()))
    }

    /// Admit a symbol matched by condition search. Idempotent. Returns
    /// `false` for a symbol that already exited this session.
    pub fn admit(&mut self, symbol: &Symbol) -> bool {
        if self.exited.contains(symbol) {
            return false;
        }
        self.admitted.insert(symbol.clone());
        true
    }

    /// Remove a symbol after its exit was requested and bar it from
    /// readmission. Idempotent.
    pub fn deregister_symbol(&mut self, symbol: &Symbol) -> bool {
        self.exited.insert(symbol.clone());
        let removed = self.admitted.remove(symbol);
        if !removed {
            debug!(symbol = %symbol, "Symbol not in condition table, deregistration skipped");
        }
        removed
    }

    pub fn is_admitted(&self, symbol: &Symbol) -> bool {
        self.admitted.contains(symbol)
    }

    pub fn has_exited(&self, symbol: &Symbol) -> bool {
        self.exited.contains(symbol)
    }
}
