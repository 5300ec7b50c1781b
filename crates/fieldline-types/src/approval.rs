//! Approval chain steps
//!
//! When a request is submitted, its full chain of department approval
//! steps is materialized up front, all `Pending`. Steps are decided in
//! strictly increasing order; each step is mutated exactly once.

use crate::{ActorId, DepartmentId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A department approver's verdict on a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Status of one approval step.
///
/// `Void` marks steps frozen by a request cancellation: they were never
/// decided and never will be, but the record is kept, not deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Void,
}

impl StepStatus {
    pub fn is_decided(&self) -> bool {
        matches!(self, StepStatus::Approved | StepStatus::Rejected)
    }
}

/// One department's slot in a request's ordered approval chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// The owning request
    pub request_id: RequestId,
    /// The department that must decide this step
    pub department: DepartmentId,
    /// 1-based position in the chain, strictly increasing, unique per request
    pub order: u32,
    /// Current status
    pub status: StepStatus,
    /// Who decided the step, once decided
    pub decided_by: Option<ActorId>,
    /// When the step was decided
    pub decided_at: Option<DateTime<Utc>>,
    /// Free-form approver remarks
    pub remarks: Option<String>,
}

impl ApprovalStep {
    /// A freshly materialized, undecided step.
    pub fn pending(request_id: RequestId, department: DepartmentId, order: u32) -> Self {
        Self {
            request_id,
            department,
            order,
            status: StepStatus::Pending,
            decided_by: None,
            decided_at: None,
            remarks: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    /// Record an approver's verdict. The caller is responsible for order
    /// and single-mutation enforcement; this only stamps the record.
    pub fn record(&mut self, status: StepStatus, actor: ActorId, remarks: Option<String>) {
        self.status = status;
        self.decided_by = Some(actor);
        self.decided_at = Some(Utc::now());
        self.remarks = remarks;
    }

    /// Freeze the step without a decision (reject cascade, cancellation).
    pub fn freeze(&mut self, status: StepStatus) {
        self.status = status;
    }
}
