//! JSON-lines replay of recorded broker callbacks.
//!
//! Each non-empty line holds one `RawEvent`. Lines starting with `#` are
//! comments. Lines that fail to parse are logged and skipped.

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::decode::{decode, RawEvent};
use crate::error::GatewayResult;
use crate::event::GatewayEvent;

/// Parse replay text into typed events.
pub fn read_replay(contents: &str) -> Vec<GatewayEvent> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(n, line)| match serde_json::from_str::<RawEvent>(line) {
            Ok(raw) => decode(&raw),
            Err(e) => {
                warn!(line = n + 1, error = %e, "Skipping malformed replay line");
                None
            }
        })
        .collect()
}

/// Feed a replay file into the event channel, one event per `interval`.
///
/// Resolves to the number of events delivered. Stops early if the
/// receiver is dropped.
pub fn spawn_replay(
    path: PathBuf,
    interval: Duration,
    events: mpsc::UnboundedSender<GatewayEvent>,
) -> JoinHandle<GatewayResult<usize>> {
    tokio::spawn(async move {
        let contents = tokio::fs::read_to_string(&path).await?;
        let decoded = read_replay(&contents);
        info!(path = %path.display(), events = decoded.len(), "Replay started");

        let mut delivered = 0;
        for event in decoded {
            if events.send(event).is_err() {
                break;
            }
            delivered += 1;
            tokio::time::sleep(interval).await;
        }
        info!(delivered, "Replay finished");
        Ok(delivered)
    })
}
