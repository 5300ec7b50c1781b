//! Persistence seam for the requisition workflow
//!
//! The engine never touches shared state directly; it goes through the two
//! repository traits here. Both contracts are optimistic: every mutation
//! presents the version it read, and a mismatch fails with
//! `ConcurrencyConflict` so the caller re-reads and resubmits.
//!
//! - [`RequestStore`] persists the request aggregate (request + approval
//!   steps + allocations) under one version, the per-request serialization
//!   point.
//! - [`LedgerStore`] persists inventory entries under per-entry versions,
//!   with [`LedgerStore::deduct`] as the transactional compare-and-decrement
//!   the allocation engine relies on. Different entries never contend.
//!
//! The in-memory implementations back tests and single-process embedders;
//! a database-backed implementation satisfies the same contracts with
//! row versions.

#![deny(unsafe_code)]

mod memory;

pub use memory::{InMemoryLedgerStore, InMemoryRequestStore};

use fieldline_types::{
    LedgerEntry, LedgerKey, Request, RequestId, RequestStatus, WorkflowResult,
};

/// Durable storage for request aggregates.
pub trait RequestStore: Send + Sync {
    /// Persist a new aggregate. Fails with `DuplicateRequest` if the id
    /// is already taken.
    fn insert(&self, request: Request) -> WorkflowResult<()>;

    /// Fetch a snapshot of the aggregate. Fails with `RequestNotFound`.
    fn get(&self, id: &RequestId) -> WorkflowResult<Request>;

    /// Replace the aggregate if `expected_version` still matches the stored
    /// version; the stored version is bumped by one. A mismatch fails with
    /// `ConcurrencyConflict` and leaves the stored aggregate untouched.
    /// Returns the aggregate as stored.
    fn update(&self, request: Request, expected_version: u64) -> WorkflowResult<Request>;

    /// All requests currently in `status`. Pure projection for queue views
    /// and scheduled re-allocation sweeps.
    fn list_by_status(&self, status: RequestStatus) -> WorkflowResult<Vec<Request>>;
}

/// Durable storage for inventory ledger entries.
pub trait LedgerStore: Send + Sync {
    /// Create or replace an entry wholesale. Intended for seeding and
    /// administrative correction, not for allocation-path mutation.
    fn upsert_entry(&self, entry: LedgerEntry) -> WorkflowResult<()>;

    /// Fetch a snapshot of one entry. Fails with `LedgerEntryNotFound`.
    fn get(&self, key: &LedgerKey) -> WorkflowResult<LedgerEntry>;

    /// The transactional compare-and-decrement: if `expected_version` matches
    /// and `available >= quantity`, reduce on-hand by `quantity` and bump the
    /// version in one step. Version mismatch fails `ConcurrencyConflict`;
    /// a shortfall fails `InsufficientAvailable`. Nothing is deducted on
    /// failure.
    fn deduct(
        &self,
        key: &LedgerKey,
        quantity: u64,
        expected_version: u64,
    ) -> WorkflowResult<LedgerEntry>;

    /// Warehouse intake: increase on-hand by `quantity`, creating the entry
    /// if it does not exist yet. The workflow only ever deducts; this is the
    /// external replenishment surface.
    fn receive(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry>;

    /// Hold back `quantity` from availability. Fails with
    /// `InsufficientAvailable` if less than `quantity` is available.
    fn reserve(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry>;

    /// Return held-back quantity to availability. Releasing more than is
    /// reserved clears the reservation.
    fn release(&self, key: &LedgerKey, quantity: u64) -> WorkflowResult<LedgerEntry>;

    /// Snapshot of every entry, for stock reports.
    fn list(&self) -> WorkflowResult<Vec<LedgerEntry>>;
}
