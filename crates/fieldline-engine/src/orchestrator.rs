//! Workflow orchestration
//!
//! The orchestrator is the command API the UI/API layer calls. Each
//! command is one logical transaction: the aggregate is read once, mutated
//! through the managers, and committed with a single versioned write.
//! Events go out strictly after the write commits; a concurrency loser
//! gets `ConcurrencyConflict` and is expected to re-read and resubmit.

use crate::{
    AllocationEngine, AllocationOutcome, AllocationReport, ApprovalRouter, ChainProgress,
    EventSink, RequestManager,
};
use fieldline_store::{LedgerStore, RequestStore};
use fieldline_types::{
    ActivityId, ActorId, ApprovalPolicy, Decision, DepartmentId, ErrorKind, LineItem, Request,
    RequestId, RequestStatus, ResourceId, ResourceKind, SiteId, WorkflowError, WorkflowEvent,
    WorkflowResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Result of submitting a request for approval.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// The request as committed (chain materialized, or auto-approved on
    /// an empty chain).
    pub request: Request,
    /// The allocation run triggered by an empty-chain auto-approval, if
    /// the policy allocates automatically.
    pub allocation: Option<AllocationReport>,
}

/// Result of recording one approval decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// The request as committed after the decision (and after the
    /// allocation run, when one was triggered).
    pub request: Request,
    /// Where the chain stands now.
    pub progress: ChainProgress,
    /// The allocation run triggered by chain completion. `None` when the
    /// chain is still advancing, was rejected, or the policy defers
    /// allocation; an `Insufficient` outcome is carried here rather than
    /// unwinding the committed approval.
    pub allocation: Option<AllocationReport>,
}

/// Per-line fulfillment summary, as shown on request detail views.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineSummary {
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
    pub requested: u64,
    pub allocated: u64,
    pub outstanding: u64,
}

/// The full UI-facing view of one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub request: Request,
    /// The step an approver may currently act on, if any.
    pub current_step_order: Option<u32>,
    pub lines: Vec<LineSummary>,
}

/// The top-level coordinator: sequences request manager, approval router,
/// and allocation engine over shared store handles.
pub struct Orchestrator {
    requests: Arc<dyn RequestStore>,
    manager: RequestManager,
    router: ApprovalRouter,
    allocator: AllocationEngine,
    sink: Arc<dyn EventSink>,
    auto_allocate: bool,
}

impl Orchestrator {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        ledger: Arc<dyn LedgerStore>,
        policy: ApprovalPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let allocator = AllocationEngine::new(requests.clone(), ledger, policy.deduct_retries);
        Self {
            requests,
            manager: RequestManager::new(),
            router: ApprovalRouter::new(policy.clone()),
            allocator,
            sink,
            auto_allocate: policy.auto_allocate,
        }
    }

    /// Create a new draft request.
    pub fn create_request(
        &self,
        requester: ActorId,
        activity: ActivityId,
        origin_department: DepartmentId,
        site: SiteId,
        line_items: Vec<LineItem>,
    ) -> WorkflowResult<Request> {
        let request = self
            .manager
            .create(requester, activity, origin_department, site, line_items)?;
        self.requests.insert(request.clone())?;
        Ok(request)
    }

    /// Submit a draft for approval: materialize the chain, or auto-approve
    /// (and optionally allocate) when the chain comes up empty.
    pub fn submit_request_for_approval(&self, id: &RequestId) -> WorkflowResult<SubmitOutcome> {
        let mut request = self.requests.get(id)?;
        let expected = request.version;

        self.manager.submit(&mut request)?;
        let progress = self.router.materialize_chain(&mut request)?;
        let auto_approved = progress == ChainProgress::Completed;
        if auto_approved {
            self.manager.approve(&mut request)?;
        }

        let stored = self.requests.update(request, expected)?;
        self.sink.emit(&WorkflowEvent::RequestSubmitted {
            request_id: stored.id.clone(),
            chain_length: stored.steps.len() as u32,
        });

        let mut allocation = None;
        if auto_approved {
            self.sink.emit(&WorkflowEvent::RequestApproved {
                request_id: stored.id.clone(),
            });
            if self.auto_allocate {
                let requester = stored.requester.clone();
                allocation = self.try_auto_allocation(id, &requester)?;
            }
        }

        let request = match allocation {
            Some(_) => self.requests.get(id)?,
            None => stored,
        };
        Ok(SubmitOutcome {
            request,
            allocation,
        })
    }

    /// Record one department's approval decision.
    ///
    /// On chain completion the request becomes `Approved` and, policy
    /// permitting, an allocation run fires immediately; its outcome rides
    /// along in the returned [`DecisionOutcome`] while the approval stays
    /// committed regardless.
    pub fn record_approval_decision(
        &self,
        id: &RequestId,
        order: u32,
        decision: Decision,
        actor: ActorId,
        remarks: Option<String>,
    ) -> WorkflowResult<DecisionOutcome> {
        let mut request = self.requests.get(id)?;
        let expected = request.version;

        let progress = self
            .router
            .decide(&mut request, order, decision, &actor, remarks)?;
        match progress {
            ChainProgress::Completed => self.manager.approve(&mut request)?,
            ChainProgress::Rejected { .. } => self.manager.reject(&mut request)?,
            ChainProgress::Advanced { .. } => {}
        }

        let stored = self.requests.update(request, expected)?;
        if let Some(step) = stored.step(order) {
            self.sink.emit(&WorkflowEvent::StepDecided {
                request_id: stored.id.clone(),
                order,
                department: step.department.clone(),
                decision,
                actor: actor.clone(),
            });
        }

        let mut allocation = None;
        match progress {
            ChainProgress::Completed => {
                self.sink.emit(&WorkflowEvent::RequestApproved {
                    request_id: stored.id.clone(),
                });
                if self.auto_allocate {
                    allocation = self.try_auto_allocation(id, &actor)?;
                }
            }
            ChainProgress::Rejected { order } => {
                if let Some(step) = stored.step(order) {
                    self.sink.emit(&WorkflowEvent::RequestRejected {
                        request_id: stored.id.clone(),
                        rejected_order: order,
                        department: step.department.clone(),
                    });
                }
            }
            ChainProgress::Advanced { .. } => {}
        }

        let request = match allocation {
            Some(_) => self.requests.get(id)?,
            None => stored,
        };
        Ok(DecisionOutcome {
            request,
            progress,
            allocation,
        })
    }

    /// Run allocation on an approved request. Fired automatically on full
    /// approval; also callable directly to retry after a restock.
    ///
    /// A run that takes nothing fails with `InsufficientInventory`; the
    /// request is untouched and stays retryable.
    pub fn trigger_allocation(
        &self,
        id: &RequestId,
        actor: ActorId,
    ) -> WorkflowResult<AllocationReport> {
        let report = self.run_allocation(id, &actor)?;
        if report.outcome == AllocationOutcome::Insufficient {
            return Err(WorkflowError::InsufficientInventory {
                request_id: report.request_id,
            });
        }
        Ok(report)
    }

    /// Cancel a request. Committed allocations and their ledger deductions
    /// are never reversed; reversal is a separate compensating intake.
    pub fn cancel_request(&self, id: &RequestId, actor: ActorId) -> WorkflowResult<Request> {
        let mut request = self.requests.get(id)?;
        let expected = request.version;
        self.manager.cancel(&mut request)?;
        let stored = self.requests.update(request, expected)?;
        self.sink.emit(&WorkflowEvent::RequestCancelled {
            request_id: stored.id.clone(),
            actor,
        });
        Ok(stored)
    }

    // ── Read projections ─────────────────────────────────────────────

    /// The full request view: status, chain with the actionable step, and
    /// per-line fulfillment. Pure projection, no side effects.
    pub fn request_snapshot(&self, id: &RequestId) -> WorkflowResult<RequestSnapshot> {
        let request = self.requests.get(id)?;
        let lines = request
            .line_items
            .iter()
            .map(|item| {
                let allocated = request.allocated_for(&item.resource_id);
                LineSummary {
                    kind: item.kind,
                    resource_id: item.resource_id.clone(),
                    requested: item.quantity,
                    allocated,
                    outstanding: item.quantity.saturating_sub(allocated),
                }
            })
            .collect();
        Ok(RequestSnapshot {
            current_step_order: request.current_step_order(),
            lines,
            request,
        })
    }

    /// Requests currently in `status`, oldest first.
    pub fn list_requests_by_status(&self, status: RequestStatus) -> WorkflowResult<Vec<Request>> {
        self.requests.list_by_status(status)
    }

    /// Allocation fired on the heels of an approval. The approval is already
    /// committed, so a benign race (someone else allocated or cancelled in
    /// the meantime) must not fail the decision that triggered it; the
    /// caller retries through [`Orchestrator::trigger_allocation`] if needed.
    fn try_auto_allocation(
        &self,
        id: &RequestId,
        actor: &ActorId,
    ) -> WorkflowResult<Option<AllocationReport>> {
        match self.run_allocation(id, actor) {
            Ok(report) => Ok(Some(report)),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::InvalidState | ErrorKind::ConcurrencyConflict
                ) =>
            {
                warn!(request_id = %id, error = %err, "auto-allocation after approval skipped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn run_allocation(&self, id: &RequestId, actor: &ActorId) -> WorkflowResult<AllocationReport> {
        let report = self.allocator.allocate(id, actor)?;
        match report.outcome {
            AllocationOutcome::Full if !report.allocations.is_empty() => {
                self.sink.emit(&WorkflowEvent::Allocated {
                    request_id: report.request_id.clone(),
                    lines: report.lines(),
                });
            }
            AllocationOutcome::Partial => {
                self.sink.emit(&WorkflowEvent::PartiallyAllocated {
                    request_id: report.request_id.clone(),
                    lines: report.lines(),
                    outstanding: report.outstanding,
                });
            }
            _ => {}
        }
        Ok(report)
    }
}
