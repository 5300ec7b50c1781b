//! Requisition Domain Types for Fieldline
//!
//! A requisition is a demand for site resources (materials, labor hours,
//! equipment time) raised by a field activity. It moves through an ordered
//! chain of department approvals and, once approved, is allocated against
//! per-site inventory ledgers.
//!
//! # Key Concepts
//!
//! - **Request**: the aggregate root. Owns its line items, its approval
//!   chain, and its allocation records, and carries the optimistic-concurrency
//!   version every mutation must present.
//! - **ApprovalStep**: one department's slot in the ordered approval chain.
//!   Decided exactly once, in strictly increasing order.
//! - **Allocation**: a committed, ledger-backed fulfillment of (part of) a
//!   line item. Append-only; corrections are new compensating records.
//! - **LedgerEntry**: the authoritative on-hand/reserved/available quantity
//!   for one resource at one site.
//! - **WorkflowEvent**: one event per state transition, published to the
//!   notification/audit/settlement sinks after the transition commits.
//!
//! # Design Principles
//!
//! 1. Status moves only forward along the transition graph. No status is
//!    ever rewound.
//! 2. Every error is typed. Callers branch on [`ErrorKind`], not on strings.
//! 3. Quantities are unsigned; `available = on_hand - reserved` can never go
//!    below zero.

#![deny(unsafe_code)]

mod allocation;
mod approval;
mod errors;
mod events;
mod ids;
mod ledger;
mod policy;
mod request;
mod resource;

pub use allocation::*;
pub use approval::*;
pub use errors::*;
pub use events::*;
pub use ids::*;
pub use ledger::*;
pub use policy::*;
pub use request::*;
pub use resource::*;
