//! Inventory ledger entries
//!
//! One entry per `(kind, resource, site)`. The entry is the source of
//! truth for "can this line item be fulfilled": `available` is on-hand
//! minus reserved and can never go below zero. Entries are mutated only
//! through the ledger store's compare-and-swap operations.

use crate::{ResourceId, ResourceKind, SiteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a ledger entry: resource kind + resource + site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
    pub site: SiteId,
}

impl LedgerKey {
    pub fn new(kind: ResourceKind, resource_id: ResourceId, site: SiteId) -> Self {
        Self {
            kind,
            resource_id,
            site,
        }
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.kind, self.resource_id, self.site)
    }
}

/// Authoritative quantity record for one resource at one site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identity
    pub key: LedgerKey,
    /// Physical quantity on hand
    pub on_hand: u64,
    /// Quantity held back by external reservations
    pub reserved: u64,
    /// Optimistic-concurrency version, bumped on every mutation
    pub version: u64,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(key: LedgerKey, on_hand: u64) -> Self {
        Self {
            key,
            on_hand,
            reserved: 0,
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Quantity an allocation may still take: on-hand minus reserved.
    pub fn available(&self) -> u64 {
        self.on_hand.saturating_sub(self.reserved)
    }
}
