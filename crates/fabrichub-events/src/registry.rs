//! The hub's three listener registries.
//!
//! Each registry sits behind its own `parking_lot::Mutex`. Lookups return
//! `Arc` snapshots so callbacks always run with every lock released.

use fabrichub_core::{Block, ChaincodeEvent, TxValidationCode};
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::HubError;
use crate::listener::Listener;

/// Handle returned by `register_block_event`. Numbers start at 1 and are
/// never reused within one hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRegistration(pub u64);

impl fmt::Display for BlockRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

/// Handle returned by `register_chaincode_event`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChaincodeRegistration {
    pub chaincode_id: String,
    pub id: u64,
}

/// Outcome of one transaction, delivered to its transaction listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxStatus {
    pub tx_id: String,
    pub validation_code: TxValidationCode,
    pub block_number: u64,
}

impl TxStatus {
    pub fn is_valid(&self) -> bool {
        self.validation_code.is_valid()
    }
}

/// Number of live registrations per registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    pub blocks: usize,
    pub transactions: usize,
    pub chaincodes: usize,
}

impl RegistryCounts {
    pub fn total(&self) -> usize {
        self.blocks + self.transactions + self.chaincodes
    }
}

pub(crate) type BlockListener = Arc<Listener<Arc<Block>>>;
pub(crate) type TxListener = Arc<Listener<TxStatus>>;
pub(crate) type ChaincodeListener = Arc<Listener<ChaincodeEvent>>;

#[derive(Default)]
struct BlockEntries {
    last_id: u64,
    listeners: BTreeMap<u64, BlockListener>,
}

struct ChaincodeEntry {
    id: u64,
    pattern: Regex,
    listener: ChaincodeListener,
}

#[derive(Default)]
struct ChaincodeEntries {
    last_id: u64,
    by_chaincode: HashMap<String, Vec<ChaincodeEntry>>,
}

#[derive(Default)]
pub(crate) struct Registries {
    blocks: Mutex<BlockEntries>,
    transactions: Mutex<HashMap<String, TxListener>>,
    chaincodes: Mutex<ChaincodeEntries>,
}

impl Registries {
    pub fn add_block(&self, listener: Listener<Arc<Block>>) -> BlockRegistration {
        let mut entries = self.blocks.lock();
        entries.last_id += 1;
        let id = entries.last_id;
        entries.listeners.insert(id, Arc::new(listener));
        BlockRegistration(id)
    }

    pub fn remove_block(&self, registration: &BlockRegistration) -> bool {
        self.blocks.lock().listeners.remove(&registration.0).is_some()
    }

    pub fn block_listeners(&self) -> Vec<BlockListener> {
        self.blocks.lock().listeners.values().cloned().collect()
    }

    /// Returns `true` if an earlier registration for `tx_id` was replaced.
    pub fn add_tx(&self, tx_id: String, listener: Listener<TxStatus>) -> bool {
        self.transactions
            .lock()
            .insert(tx_id, Arc::new(listener))
            .is_some()
    }

    pub fn remove_tx(&self, tx_id: &str) -> bool {
        self.transactions.lock().remove(tx_id).is_some()
    }

    pub fn tx_listener(&self, tx_id: &str) -> Option<TxListener> {
        self.transactions.lock().get(tx_id).cloned()
    }

    pub fn has_tx_listeners(&self) -> bool {
        !self.transactions.lock().is_empty()
    }

    pub fn add_chaincode(
        &self,
        chaincode_id: String,
        pattern: Regex,
        listener: Listener<ChaincodeEvent>,
    ) -> ChaincodeRegistration {
        let mut entries = self.chaincodes.lock();
        entries.last_id += 1;
        let id = entries.last_id;
        entries
            .by_chaincode
            .entry(chaincode_id.clone())
            .or_default()
            .push(ChaincodeEntry {
                id,
                pattern,
                listener: Arc::new(listener),
            });
        ChaincodeRegistration { chaincode_id, id }
    }

    pub fn remove_chaincode(&self, registration: &ChaincodeRegistration) -> bool {
        let mut entries = self.chaincodes.lock();
        let Some(set) = entries.by_chaincode.get_mut(&registration.chaincode_id) else {
            return false;
        };
        let before = set.len();
        set.retain(|e| e.id != registration.id);
        let removed = set.len() != before;
        if set.is_empty() {
            entries.by_chaincode.remove(&registration.chaincode_id);
        }
        removed
    }

    /// Listeners on `chaincode_id` whose pattern matches anywhere in `event_name`.
    pub fn chaincode_matches(&self, chaincode_id: &str, event_name: &str) -> Vec<ChaincodeListener> {
        self.chaincodes
            .lock()
            .by_chaincode
            .get(chaincode_id)
            .map(|set| {
                set.iter()
                    .filter(|e| e.pattern.is_match(event_name))
                    .map(|e| Arc::clone(&e.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_chaincode_listeners(&self) -> bool {
        !self.chaincodes.lock().by_chaincode.is_empty()
    }

    pub fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            blocks: self.blocks.lock().listeners.len(),
            transactions: self.transactions.lock().len(),
            chaincodes: self
                .chaincodes
                .lock()
                .by_chaincode
                .values()
                .map(Vec::len)
                .sum(),
        }
    }

    /// Empty all three registries, returning what was in them.
    pub fn drain(&self) -> Drained {
        let blocks = std::mem::take(&mut self.blocks.lock().listeners)
            .into_values()
            .collect();
        let transactions = std::mem::take(&mut *self.transactions.lock())
            .into_values()
            .collect();
        let chaincodes = std::mem::take(&mut self.chaincodes.lock().by_chaincode)
            .into_values()
            .flatten()
            .map(|e| e.listener)
            .collect();
        Drained {
            blocks,
            transactions,
            chaincodes,
        }
    }
}

/// Listeners removed by [`Registries::drain`].
pub(crate) struct Drained {
    blocks: Vec<BlockListener>,
    transactions: Vec<TxListener>,
    chaincodes: Vec<ChaincodeListener>,
}

impl Drained {
    pub fn len(&self) -> usize {
        self.blocks.len() + self.transactions.len() + self.chaincodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `error` to every listener that has an error callback.
    pub fn fail_all(self, error: &HubError) {
        for l in &self.blocks {
            l.fail(error.clone());
        }
        for l in &self.transactions {
            l.fail(error.clone());
        }
        for l in &self.chaincodes {
            l.fail(error.clone());
        }
    }
}
