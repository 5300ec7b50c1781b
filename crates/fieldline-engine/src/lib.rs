//! Requisition Workflow Engine for Fieldline
//!
//! The engine coordinates the resource request lifecycle: a field activity
//! raises a request, the request passes an ordered chain of department
//! approvals, and approved requests are allocated against per-site
//! inventory ledgers. Allocation outcomes are published as events for the
//! settlement and audit consumers.
//!
//! # Key Concepts
//!
//! - **RequestManager**: owns the request lifecycle (creation, submission,
//!   cancellation) and nothing else.
//! - **ApprovalRouter**: materializes the approval chain from the configured
//!   department precedence and advances it one decision at a time, in strict
//!   step order.
//! - **AllocationEngine**: fulfills approved requests from the inventory
//!   ledger via per-entry compare-and-decrement; partial fulfillment is a
//!   defined outcome, not an accident.
//! - **Orchestrator**: the command API the UI/API layer calls. Sequences the
//!   three components, commits each command as one aggregate write, and
//!   emits one event per state transition after the write commits.
//!
//! # Design Principles
//!
//! 1. The engine holds no package-level mutable state; all shared state
//!    lives behind injected store handles.
//! 2. Cross-call correctness comes from data-level serialization: one
//!    version per request aggregate, one version per ledger entry.
//! 3. Events never gate a transition. A slow or failing sink cannot hold
//!    up or roll back a commit.

#![deny(unsafe_code)]

mod allocation_engine;
mod approval_router;
mod orchestrator;
mod request_manager;
mod sink;

pub use allocation_engine::*;
pub use approval_router::*;
pub use orchestrator::*;
pub use request_manager::*;
pub use sink::*;
