//! Approval chain routing
//!
//! The router materializes the full ordered chain when a request enters
//! approval and advances it one decision at a time. Only the lowest
//! pending step is ever actionable; a single rejection terminates the
//! chain and freezes everything after it.

use fieldline_types::{
    ActorId, ApprovalPolicy, ApprovalStep, Decision, Request, RequestStatus, StepStatus,
    WorkflowError, WorkflowResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where the chain stands after a router operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "progress", rename_all = "snake_case")]
pub enum ChainProgress {
    /// The chain continues; `next_order` is now the actionable step.
    Advanced { next_order: u32 },
    /// Every step approved. The request may move to `Approved`.
    Completed,
    /// Step `order` rejected; all later steps are frozen `Rejected`.
    Rejected { order: u32 },
}

/// Materializes and advances department approval chains.
#[derive(Clone, Debug)]
pub struct ApprovalRouter {
    policy: ApprovalPolicy,
}

impl ApprovalRouter {
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self { policy }
    }

    /// Build the ordered step set for a freshly submitted request: the
    /// configured precedence list with the origin department skipped, all
    /// steps `Pending`, step 1 actionable.
    ///
    /// An empty chain (every configured department is the origin, or no
    /// precedence is configured) completes immediately.
    pub fn materialize_chain(&self, request: &mut Request) -> WorkflowResult<ChainProgress> {
        if request.status != RequestStatus::PendingApproval {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "pending_approval",
            });
        }
        if !request.steps.is_empty() {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "a request without a materialized chain",
            });
        }

        let departments = self.policy.chain_for(&request.origin_department);
        if departments.is_empty() {
            debug!(request_id = %request.id, "empty approval chain, completing immediately");
            return Ok(ChainProgress::Completed);
        }

        request.steps = departments
            .into_iter()
            .enumerate()
            .map(|(idx, department)| {
                ApprovalStep::pending(request.id.clone(), department, idx as u32 + 1)
            })
            .collect();
        request.touch();
        debug!(request_id = %request.id, steps = request.steps.len(), "approval chain materialized");
        Ok(ChainProgress::Advanced { next_order: 1 })
    }

    /// Record one department's decision on step `order`.
    ///
    /// Enforces: the request is still in approval, the step exists and was
    /// never decided, and `order` is the current lowest pending step. On
    /// rejection, every later pending step is frozen `Rejected` without an
    /// actor of its own.
    pub fn decide(
        &self,
        request: &mut Request,
        order: u32,
        decision: Decision,
        actor: &ActorId,
        remarks: Option<String>,
    ) -> WorkflowResult<ChainProgress> {
        if request.status != RequestStatus::PendingApproval {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "pending_approval",
            });
        }

        let step = request
            .step(order)
            .ok_or_else(|| WorkflowError::StepNotFound {
                request_id: request.id.clone(),
                order,
            })?;
        if !step.is_pending() {
            return Err(WorkflowError::AlreadyDecided {
                request_id: request.id.clone(),
                order,
                status: step.status,
            });
        }

        // The step is pending, so a current step necessarily exists.
        let current = request.current_step_order().unwrap_or(order);
        if order != current {
            return Err(WorkflowError::OutOfOrder {
                request_id: request.id.clone(),
                attempted: order,
                current,
            });
        }

        let request_id = request.id.clone();
        let step = request
            .step_mut(order)
            .ok_or_else(|| WorkflowError::StepNotFound {
                request_id: request_id.clone(),
                order,
            })?;
        match decision {
            Decision::Approve => {
                step.record(StepStatus::Approved, actor.clone(), remarks);
                request.touch();
                match request.current_step_order() {
                    Some(next_order) => {
                        debug!(request_id = %request.id, order, next_order, "step approved");
                        Ok(ChainProgress::Advanced { next_order })
                    }
                    None => {
                        debug!(request_id = %request.id, order, "chain completed");
                        Ok(ChainProgress::Completed)
                    }
                }
            }
            Decision::Reject => {
                step.record(StepStatus::Rejected, actor.clone(), remarks);
                let mut frozen = 0;
                for later in request
                    .steps
                    .iter_mut()
                    .filter(|s| s.order > order && s.is_pending())
                {
                    later.freeze(StepStatus::Rejected);
                    frozen += 1;
                }
                request.touch();
                warn!(request_id = %request.id, order, frozen, "chain rejected");
                Ok(ChainProgress::Rejected { order })
            }
        }
    }
}
