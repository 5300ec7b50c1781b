//! Workflow events
//!
//! One event per state transition, published after the transition commits.
//! Consumers are the notification badge, the audit log, and the financial
//! settlement module; delivery is fire-and-forget and at-least-once.

use crate::{ActorId, Decision, DepartmentId, RequestId, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};

/// Quantity taken for one line item, as carried by allocation events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedLine {
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
    pub quantity: u64,
}

/// Events emitted by the workflow, one per request state transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A draft entered the approval chain.
    RequestSubmitted {
        request_id: RequestId,
        chain_length: u32,
    },

    /// One approval step was decided.
    StepDecided {
        request_id: RequestId,
        order: u32,
        department: DepartmentId,
        decision: Decision,
        actor: ActorId,
    },

    /// Every step in the chain approved.
    RequestApproved { request_id: RequestId },

    /// A step rejected; the chain is terminated.
    RequestRejected {
        request_id: RequestId,
        rejected_order: u32,
        department: DepartmentId,
    },

    /// Every line item received its full requested quantity.
    Allocated {
        request_id: RequestId,
        lines: Vec<AllocatedLine>,
    },

    /// Some, but not all, outstanding quantity was fulfilled.
    PartiallyAllocated {
        request_id: RequestId,
        lines: Vec<AllocatedLine>,
        outstanding: u64,
    },

    /// The request was cancelled.
    RequestCancelled {
        request_id: RequestId,
        actor: ActorId,
    },
}

impl WorkflowEvent {
    /// The request this event belongs to.
    pub fn request_id(&self) -> &RequestId {
        match self {
            WorkflowEvent::RequestSubmitted { request_id, .. }
            | WorkflowEvent::StepDecided { request_id, .. }
            | WorkflowEvent::RequestApproved { request_id }
            | WorkflowEvent::RequestRejected { request_id, .. }
            | WorkflowEvent::Allocated { request_id, .. }
            | WorkflowEvent::PartiallyAllocated { request_id, .. }
            | WorkflowEvent::RequestCancelled { request_id, .. } => request_id,
        }
    }

    /// Stable name for logs and audit rows.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::RequestSubmitted { .. } => "request_submitted",
            WorkflowEvent::StepDecided { .. } => "step_decided",
            WorkflowEvent::RequestApproved { .. } => "request_approved",
            WorkflowEvent::RequestRejected { .. } => "request_rejected",
            WorkflowEvent::Allocated { .. } => "allocated",
            WorkflowEvent::PartiallyAllocated { .. } => "partially_allocated",
            WorkflowEvent::RequestCancelled { .. } => "request_cancelled",
        }
    }
}
