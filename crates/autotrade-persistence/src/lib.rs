//! Persistence for the auto-trader.
//!
//! The watchlist table and the trading settings are stored as JSON
//! documents under a data directory. Writes go to a temporary file that is
//! renamed over the target, so a crash mid-write leaves the previous
//! document intact.

pub mod error;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use store::{FilePersistence, JsonFileStore, PersistenceStore, SETTINGS_FILE, WATCHLIST_FILE};
