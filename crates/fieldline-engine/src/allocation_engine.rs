//! Inventory allocation
//!
//! Fulfills approved requests from the ledger. Each line item is taken
//! independently: read the entry, compute `min(outstanding, available)`,
//! and commit the take through the store's compare-and-decrement. Only
//! same-entry contention serializes; different resources never wait on
//! each other.
//!
//! Retry safety: the engine only ever acts on outstanding quantity
//! (requested minus already allocated), so re-running it after a partial
//! result, a conflict, or a restock is idempotent at the line-item level.

use fieldline_store::{LedgerStore, RequestStore};
use fieldline_types::{
    ActorId, AllocatedLine, Allocation, LedgerKey, LineItem, Request, RequestId, RequestStatus,
    SiteId, WorkflowError, WorkflowResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// How an allocation run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// Every line item is now fully allocated.
    Full,
    /// Something was taken, but outstanding quantity remains.
    Partial,
    /// Nothing at all could be taken. The request is untouched and the
    /// run may be repeated once inventory is replenished.
    Insufficient,
}

/// Result of one allocation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationReport {
    pub request_id: RequestId,
    pub outcome: AllocationOutcome,
    /// Allocation records this run appended (empty for `Insufficient`).
    pub allocations: Vec<Allocation>,
    /// Request status after the run committed.
    pub status: RequestStatus,
    /// Total outstanding quantity across line items after the run.
    pub outstanding: u64,
}

impl AllocationReport {
    /// Per-line quantities taken by this run, as carried by events.
    pub fn lines(&self) -> Vec<AllocatedLine> {
        self.allocations
            .iter()
            .map(|a| AllocatedLine {
                kind: a.kind,
                resource_id: a.resource_id.clone(),
                quantity: a.quantity,
            })
            .collect()
    }
}

/// Fulfills approved requests against the inventory ledger.
pub struct AllocationEngine {
    requests: Arc<dyn RequestStore>,
    ledger: Arc<dyn LedgerStore>,
    deduct_retries: u32,
}

impl AllocationEngine {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        ledger: Arc<dyn LedgerStore>,
        deduct_retries: u32,
    ) -> Self {
        Self {
            requests,
            ledger,
            deduct_retries,
        }
    }

    /// Run one allocation pass over the request's outstanding line items.
    ///
    /// Ledger deductions commit line by line; the allocation records and
    /// the status change then commit as one aggregate write. A run that
    /// takes nothing reports `Insufficient` and leaves the request exactly
    /// as it found it.
    pub fn allocate(
        &self,
        request_id: &RequestId,
        actor: &ActorId,
    ) -> WorkflowResult<AllocationReport> {
        let request = self.requests.get(request_id)?;
        if !request.status.accepts_allocation() {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "approved or partially_allocated",
            });
        }

        let mut taken: Vec<(LineItem, u64)> = Vec::new();
        for item in &request.line_items {
            let outstanding = request.outstanding_for(item);
            if outstanding == 0 {
                continue;
            }
            let quantity = self.deduct_outstanding(&request.site, item, outstanding)?;
            if quantity > 0 {
                taken.push((item.clone(), quantity));
            }
        }

        if taken.is_empty() {
            debug!(request_id = %request.id, "nothing available for any outstanding line item");
            return Ok(AllocationReport {
                request_id: request.id.clone(),
                outcome: if request.fully_allocated() {
                    AllocationOutcome::Full
                } else {
                    AllocationOutcome::Insufficient
                },
                allocations: Vec::new(),
                status: request.status,
                outstanding: request.total_outstanding(),
            });
        }

        self.commit(request, taken, actor)
    }

    /// Take up to `outstanding` from the line item's ledger entry via
    /// compare-and-decrement, re-reading on version conflicts. A missing
    /// entry counts as zero available; bounded retries protect against
    /// livelock on a hot entry.
    fn deduct_outstanding(
        &self,
        site: &SiteId,
        item: &LineItem,
        outstanding: u64,
    ) -> WorkflowResult<u64> {
        let key = LedgerKey::new(item.kind, item.resource_id.clone(), site.clone());
        for _ in 0..self.deduct_retries {
            let entry = match self.ledger.get(&key) {
                Ok(entry) => entry,
                Err(WorkflowError::LedgerEntryNotFound { .. }) => return Ok(0),
                Err(e) => return Err(e),
            };
            let take = outstanding.min(entry.available());
            if take == 0 {
                return Ok(0);
            }
            match self.ledger.deduct(&key, take, entry.version) {
                Ok(_) => {
                    debug!(key = %key, take, "deducted from ledger");
                    return Ok(take);
                }
                // Lost the race on this entry: re-read and try again with
                // whatever is left.
                Err(WorkflowError::ConcurrencyConflict { .. })
                | Err(WorkflowError::InsufficientAvailable { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        warn!(key = %key, retries = self.deduct_retries, "ledger entry too contended, skipping line");
        Ok(0)
    }

    /// Append the run's allocation records and move the request status.
    ///
    /// The deductions are already committed, so a version race here is
    /// resolved by re-reading the aggregate and re-appending the same
    /// records, never by deducting again. If a cancel won the race, the
    /// records are still appended (the ledger quantities are gone and must
    /// stay auditable) but the status is left alone.
    fn commit(
        &self,
        mut request: Request,
        taken: Vec<(LineItem, u64)>,
        actor: &ActorId,
    ) -> WorkflowResult<AllocationReport> {
        loop {
            let expected = request.version;
            let mut appended = Vec::with_capacity(taken.len());
            for (item, quantity) in &taken {
                let allocation = Allocation::new(
                    request.id.clone(),
                    request.next_allocation_sequence(),
                    item.kind,
                    item.resource_id.clone(),
                    *quantity,
                    request.site.clone(),
                    actor.clone(),
                );
                request.allocations.push(allocation.clone());
                appended.push(allocation);
            }

            if request.status.accepts_allocation() {
                if request.fully_allocated() {
                    request.transition_to(RequestStatus::Allocated)?;
                } else if request.status == RequestStatus::Approved {
                    request.transition_to(RequestStatus::PartiallyAllocated)?;
                } else {
                    request.touch();
                }
            } else {
                request.touch();
            }

            match self.requests.update(request.clone(), expected) {
                Ok(stored) => {
                    let outcome = if stored.fully_allocated() {
                        AllocationOutcome::Full
                    } else {
                        AllocationOutcome::Partial
                    };
                    debug!(
                        request_id = %stored.id,
                        records = appended.len(),
                        outcome = ?outcome,
                        "allocation committed"
                    );
                    return Ok(AllocationReport {
                        request_id: stored.id.clone(),
                        outcome,
                        allocations: appended,
                        status: stored.status,
                        outstanding: stored.total_outstanding(),
                    });
                }
                Err(WorkflowError::ConcurrencyConflict { .. }) => {
                    warn!(request_id = %request.id, "aggregate raced during allocation commit, replaying records");
                    request = self.requests.get(&request.id)?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
