//! Append-only buffer of decoded events.
//!
//! Events are keyed, ordered and deduplicated by `(block_number, log_index)`,
//! so live and backfill sources can interleave deliveries in any order and
//! converge on the same store. Secondary indexes by event name and by
//! transaction keep resolver scans and reorg retraction off the full set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use alloy::primitives::B256;

use crate::models::{DecodedEvent, EventKey};

#[derive(Debug, Default)]
pub struct EventStore {
    events: BTreeMap<EventKey, DecodedEvent>,
    by_name: HashMap<String, BTreeSet<EventKey>>,
    by_tx: HashMap<B256, Vec<EventKey>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. A duplicate `(block_number, log_index)` key is a
    /// no-op — the first delivery wins and the store stays immutable.
    /// Returns whether the event was newly inserted.
    pub fn insert(&mut self, event: DecodedEvent) -> bool {
        let key = event.key();
        if self.events.contains_key(&key) {
            return false;
        }
        self.by_name
            .entry(event.event_name.clone())
            .or_default()
            .insert(key);
        self.by_tx
            .entry(event.transaction_hash)
            .or_default()
            .push(key);
        self.events.insert(key, event);
        true
    }

    pub fn get(&self, key: &EventKey) -> Option<&DecodedEvent> {
        self.events.get(key)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in chain order.
    pub fn iter(&self) -> impl Iterator<Item = &DecodedEvent> {
        self.events.values()
    }

    /// Events of one family in chain order.
    pub fn by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a DecodedEvent> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|key| self.events.get(key))
    }

    pub fn by_transaction(&self, tx: B256) -> Vec<&DecodedEvent> {
        self.by_tx
            .get(&tx)
            .into_iter()
            .flatten()
            .filter_map(|key| self.events.get(key))
            .collect()
    }

    /// Drop every event of a no-longer-canonical transaction (reorg).
    /// Returns the removed events so the caller can retract derived state.
    pub fn remove_transaction(&mut self, tx: B256) -> Vec<DecodedEvent> {
        let keys = self.by_tx.remove(&tx).unwrap_or_default();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(event) = self.events.remove(&key) {
                if let Some(index) = self.by_name.get_mut(&event.event_name) {
                    index.remove(&key);
                }
                removed.push(event);
            }
        }
        removed
    }

    /// Highest chain position observed so far.
    pub fn last_key(&self) -> Option<EventKey> {
        self.events.keys().next_back().copied()
    }
}
