//! Allocation records
//!
//! An allocation is a committed, ledger-backed fulfillment of part of a
//! line item. Records are append-only: a correction is a new compensating
//! record, never an edit. Every record corresponds 1:1 with a ledger
//! deduction that committed with it.

use crate::{ActorId, AllocationId, RequestId, ResourceId, ResourceKind, SiteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed fulfillment of (part of) one line item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique record id
    pub id: AllocationId,
    /// The owning request
    pub request_id: RequestId,
    /// Per-request append sequence, strictly increasing
    pub sequence: u64,
    /// Resource kind of the fulfilled line item
    pub kind: ResourceKind,
    /// Resource of the fulfilled line item
    pub resource_id: ResourceId,
    /// Quantity taken from the ledger
    pub quantity: u64,
    /// The warehouse/site the quantity was taken from
    pub source_site: SiteId,
    /// Who triggered the allocation
    pub allocated_by: ActorId,
    /// When the allocation committed
    pub allocated_at: DateTime<Utc>,
}

impl Allocation {
    pub fn new(
        request_id: RequestId,
        sequence: u64,
        kind: ResourceKind,
        resource_id: ResourceId,
        quantity: u64,
        source_site: SiteId,
        allocated_by: ActorId,
    ) -> Self {
        Self {
            id: AllocationId::generate(),
            request_id,
            sequence,
            kind,
            resource_id,
            quantity,
            source_site,
            allocated_by,
            allocated_at: Utc::now(),
        }
    }
}
