//! In-memory store implementations
//!
//! `RwLock<HashMap>` maps keyed by record identity. All version checks and
//! mutations happen under the write lock, which is what makes `deduct` a
//! true compare-and-decrement: no interleaving between the availability
//! check and the decrement is possible.

use crate::{LedgerStore, RequestStore};
use chrono::Utc;
use fieldline_types::{
    LedgerEntry, LedgerKey, Request, RequestId, RequestStatus, WorkflowError, WorkflowResult,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe in-memory request store.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, Request>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }
}

impl RequestStore for InMemoryRequestStore {
    fn insert(&self, request: Request) -> WorkflowResult<()> {
        let mut requests = self.requests.write().map_err(|_| WorkflowError::Lock)?;
        if requests.contains_key(&request.id) {
            return Err(WorkflowError::DuplicateRequest {
                request_id: request.id,
            });
        }
        requests.insert(request.id.clone(), request);
        Ok(())
    }

    fn get(&self, id: &RequestId) -> WorkflowResult<Request> {
        let requests = self.requests.read().map_err(|_| WorkflowError::Lock)?;
        requests
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::RequestNotFound {
                request_id: id.clone(),
            })
    }

    fn update(&self, mut request: Request, expected_version: u64) -> WorkflowResult<Request> {
        let mut requests = self.requests.write().map_err(|_| WorkflowError::Lock)?;
        let stored = requests
            .get(&request.id)
            .ok_or_else(|| WorkflowError::RequestNotFound {
                request_id: request.id.clone(),
            })?;
        if stored.version != expected_version {
            return Err(WorkflowError::ConcurrencyConflict {
                entity: "request",
                id: request.id.0.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }
        request.version = expected_version + 1;
        requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn list_by_status(&self, status: RequestStatus) -> WorkflowResult<Vec<Request>> {
        let requests = self.requests.read().map_err(|_| WorkflowError::Lock)?;
        let mut matching: Vec<_> = requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }
}

/// Thread-safe in-memory inventory ledger store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<HashMap<LedgerKey, LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn upsert_entry(&self, entry: LedgerEntry) -> WorkflowResult<()> {
        let mut entries = self.entries.write().map_err(|_| WorkflowError::Lock)?;
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn get(&self, key: &LedgerKey) -> WorkflowResult<LedgerEntry> {
        let entries = self.entries.read().map_err(|_| WorkflowError::Lock)?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| WorkflowError::LedgerEntryNotFound { key: key.clone() })
    }

    fn deduct(
        &self,
        key: &LedgerKey,
        quantity: u64,
        expected_version: u64,
    ) -> WorkflowResult<LedgerEntry> {
        let mut entries = self.entries.write().map_err(|_| WorkflowError::Lock)?;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| WorkflowError::LedgerEntryNotFound { key: key.clone() })?;
        if entry.version != expected_version {
            return Err(WorkflowError::ConcurrencyConflict {
                entity: "ledger entry",
                id: key.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        if entry.available() < quantity {
            return Err(WorkflowError::InsufficientAvailable {
                key: key.clone(),
                requested: quantity,
                available: entry.available(),
            });
        }
        entry.on_hand -= quantity;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn receive(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry> {
        let mut entries = self.entries.write().map_err(|_| WorkflowError::Lock)?;
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| LedgerEntry::new(key.clone(), 0));
        entry.on_hand += quantity;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn reserve(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry> {
        let mut entries = self.entries.write().map_err(|_| WorkflowError::Lock)?;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| WorkflowError::LedgerEntryNotFound { key: key.clone() })?;
        if entry.available() < quantity {
            return Err(WorkflowError::InsufficientAvailable {
                key: key.clone(),
                requested: quantity,
                available: entry.available(),
            });
        }
        entry.reserved += quantity;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn release(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry> {
        let mut entries = self.entries.write().map_err(|_| WorkflowError::Lock)?;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| WorkflowError::LedgerEntryNotFound { key: key.clone() })?;
        entry.reserved = entry.reserved.saturating_sub(quantity);
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn list(&self) -> WorkflowResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().map_err(|_| WorkflowError::Lock)?;
        Ok(entries.values().cloned().collect())
    }
}
