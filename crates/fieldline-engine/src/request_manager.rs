//! Request lifecycle management
//!
//! The manager owns the request entity's lifecycle (creation, submission,
//! cancellation) and the line-item freeze rule. It mutates aggregates in
//! memory; the orchestrator decides when a mutation becomes a committed
//! store write.

use fieldline_types::{
    ActivityId, ActorId, DepartmentId, LineItem, Request, RequestStatus, SiteId, StepStatus,
    WorkflowError, WorkflowResult,
};
use tracing::info;

/// Owns creation, submission, and cancellation of requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestManager;

impl RequestManager {
    pub fn new() -> Self {
        Self
    }

    /// Create a new request in `Draft`. Line items are validated here and
    /// frozen once the request leaves `Draft`.
    pub fn create(
        &self,
        requester: ActorId,
        activity: ActivityId,
        origin_department: DepartmentId,
        site: SiteId,
        line_items: Vec<LineItem>,
    ) -> WorkflowResult<Request> {
        let request = Request::new(requester, activity, origin_department, site, line_items)?;
        info!(request_id = %request.id, items = request.line_items.len(), "request created");
        Ok(request)
    }

    /// Add a line item to a draft. Re-runs the same uniqueness and quantity
    /// validation as creation; fails once the request has been submitted.
    pub fn add_line_item(&self, request: &mut Request, item: LineItem) -> WorkflowResult<()> {
        if request.status != RequestStatus::Draft {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "draft",
            });
        }
        if item.quantity == 0 {
            return Err(WorkflowError::ZeroQuantity {
                resource_id: item.resource_id,
            });
        }
        if request.line_item(&item.resource_id).is_some() {
            return Err(WorkflowError::DuplicateLineItem {
                resource_id: item.resource_id,
            });
        }
        request.line_items.push(item);
        request.touch();
        Ok(())
    }

    /// `Draft -> PendingApproval`. The approval router materializes the
    /// chain immediately afterwards.
    pub fn submit(&self, request: &mut Request) -> WorkflowResult<()> {
        if request.status != RequestStatus::Draft {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "draft",
            });
        }
        request.transition_to(RequestStatus::PendingApproval)?;
        info!(request_id = %request.id, "request submitted");
        Ok(())
    }

    /// Mark the request approved once its chain completes.
    pub fn approve(&self, request: &mut Request) -> WorkflowResult<()> {
        request.transition_to(RequestStatus::Approved)?;
        info!(request_id = %request.id, "request approved");
        Ok(())
    }

    /// Mark the request rejected once any step rejects.
    pub fn reject(&self, request: &mut Request) -> WorkflowResult<()> {
        request.transition_to(RequestStatus::Rejected)?;
        info!(request_id = %request.id, "request rejected");
        Ok(())
    }

    /// Cancel the request. Surviving `Pending` steps are voided, never
    /// deleted; committed allocations and ledger deductions stay committed.
    pub fn cancel(&self, request: &mut Request) -> WorkflowResult<()> {
        if !request.status.may_cancel() {
            return Err(WorkflowError::InvalidState {
                request_id: request.id.clone(),
                status: request.status,
                expected: "draft, pending_approval, approved, or partially_allocated",
            });
        }
        for step in request.steps.iter_mut().filter(|s| s.is_pending()) {
            step.freeze(StepStatus::Void);
        }
        request.transition_to(RequestStatus::Cancelled)?;
        info!(request_id = %request.id, "request cancelled");
        Ok(())
    }
}
