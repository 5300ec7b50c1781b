//! The request aggregate and its status graph
//!
//! A `Request` exclusively owns its approval steps and allocation records.
//! The whole aggregate carries a single optimistic-concurrency version:
//! any two mutations racing on the same request serialize on it.

use crate::{
    ActivityId, ActorId, Allocation, ApprovalStep, DepartmentId, LineItem, RequestId, ResourceId,
    SiteId, StepStatus, WorkflowError, WorkflowResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle status of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Allocated,
    PartiallyAllocated,
    Cancelled,
}

impl RequestStatus {
    /// The forward transition graph. Status never moves backward.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Draft, PendingApproval)
                | (Draft, Cancelled)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (PendingApproval, Cancelled)
                | (Approved, Allocated)
                | (Approved, PartiallyAllocated)
                | (Approved, Cancelled)
                | (PartiallyAllocated, Allocated)
                | (PartiallyAllocated, Cancelled)
        )
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Allocated | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }

    /// States the allocation engine may act on.
    pub fn accepts_allocation(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::PartiallyAllocated
        )
    }

    /// States a cancel command is honored from. Cancelling after partial
    /// allocation stops further attempts but never reverses committed
    /// allocations.
    pub fn may_cancel(self) -> bool {
        matches!(
            self,
            RequestStatus::Draft
                | RequestStatus::PendingApproval
                | RequestStatus::Approved
                | RequestStatus::PartiallyAllocated
        )
    }
}

/// A resource ask tied to an activity, carrying one or more line items.
///
/// The aggregate root: approval steps and allocations live inside it and
/// are only reachable through it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    /// Unique request id
    pub id: RequestId,
    /// The user who raised the request
    pub requester: ActorId,
    /// The field activity the resources are for
    pub activity: ActivityId,
    /// Department the request originates from (skipped in the approval chain)
    pub origin_department: DepartmentId,
    /// Site whose ledgers fulfill this request
    pub site: SiteId,
    /// The demanded resources; unique per resource, frozen once submitted
    pub line_items: Vec<LineItem>,
    /// Current lifecycle status
    pub status: RequestStatus,
    /// The materialized approval chain, ordered by step order
    pub steps: Vec<ApprovalStep>,
    /// Append-only allocation records
    pub allocations: Vec<Allocation>,
    /// Optimistic-concurrency version of the whole aggregate
    pub version: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Create a new request in `Draft`.
    ///
    /// Validates the line-item set: it must be non-empty, every quantity
    /// must be positive, and no resource may appear twice.
    pub fn new(
        requester: ActorId,
        activity: ActivityId,
        origin_department: DepartmentId,
        site: SiteId,
        line_items: Vec<LineItem>,
    ) -> WorkflowResult<Self> {
        validate_line_items(&line_items)?;
        let now = Utc::now();
        Ok(Self {
            id: RequestId::generate(),
            requester,
            activity,
            origin_department,
            site,
            line_items,
            status: RequestStatus::Draft,
            steps: Vec::new(),
            allocations: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Move the request along the transition graph.
    pub fn transition_to(&mut self, next: RequestStatus) -> WorkflowResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                request_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ── Line item queries ────────────────────────────────────────────

    pub fn line_item(&self, resource_id: &ResourceId) -> Option<&LineItem> {
        self.line_items.iter().find(|i| &i.resource_id == resource_id)
    }

    /// Total quantity already allocated for one line item.
    pub fn allocated_for(&self, resource_id: &ResourceId) -> u64 {
        self.allocations
            .iter()
            .filter(|a| &a.resource_id == resource_id)
            .map(|a| a.quantity)
            .sum()
    }

    /// Requested minus already-allocated quantity for one line item.
    pub fn outstanding_for(&self, item: &LineItem) -> u64 {
        item.quantity
            .saturating_sub(self.allocated_for(&item.resource_id))
    }

    /// Total outstanding quantity across all line items.
    pub fn total_outstanding(&self) -> u64 {
        self.line_items
            .iter()
            .map(|item| self.outstanding_for(item))
            .sum()
    }

    /// Whether every line item received its full requested quantity.
    pub fn fully_allocated(&self) -> bool {
        self.total_outstanding() == 0
    }

    // ── Approval chain queries ───────────────────────────────────────

    /// The lowest-numbered pending step: the only one an approver may act on.
    pub fn current_step_order(&self) -> Option<u32> {
        self.steps
            .iter()
            .filter(|s| s.is_pending())
            .map(|s| s.order)
            .min()
    }

    pub fn step(&self, order: u32) -> Option<&ApprovalStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    pub fn step_mut(&mut self, order: u32) -> Option<&mut ApprovalStep> {
        self.steps.iter_mut().find(|s| s.order == order)
    }

    /// Whether every step in the chain is approved.
    pub fn chain_approved(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status == StepStatus::Approved)
    }

    // ── Allocation bookkeeping ───────────────────────────────────────

    /// Sequence number the next appended allocation record takes.
    pub fn next_allocation_sequence(&self) -> u64 {
        self.allocations
            .iter()
            .map(|a| a.sequence)
            .max()
            .map(|s| s + 1)
            .unwrap_or(1)
    }
}

fn validate_line_items(line_items: &[LineItem]) -> WorkflowResult<()> {
    if line_items.is_empty() {
        return Err(WorkflowError::EmptyLineItems);
    }
    let mut seen: HashSet<&ResourceId> = HashSet::new();
    for item in line_items {
        if item.quantity == 0 {
            return Err(WorkflowError::ZeroQuantity {
                resource_id: item.resource_id.clone(),
            });
        }
        if !seen.insert(&item.resource_id) {
            return Err(WorkflowError::DuplicateLineItem {
                resource_id: item.resource_id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    fn make_request(line_items: Vec<LineItem>) -> WorkflowResult<Request> {
        Request::new(
            ActorId::new("alice"),
            ActivityId::new("pour-foundation"),
            DepartmentId::new("site-ops"),
            SiteId::new("site-1"),
            line_items,
        )
    }

    #[test]
    fn new_request_starts_draft() {
        let request = make_request(vec![LineItem::material("cement", 5)]).unwrap();
        assert_eq!(request.status, RequestStatus::Draft);
        assert_eq!(request.version, 1);
        assert!(request.steps.is_empty());
    }

    #[test]
    fn empty_line_items_rejected() {
        let err = make_request(vec![]).unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyLineItems));
    }

    #[test]
    fn zero_quantity_rejected() {
        let err = make_request(vec![LineItem::labor("electrician", 0)]).unwrap_err();
        assert!(matches!(err, WorkflowError::ZeroQuantity { .. }));
    }

    #[test]
    fn duplicate_resource_rejected() {
        let err = make_request(vec![
            LineItem::material("cement", 5),
            LineItem::new(ResourceKind::Material, ResourceId::new("cement"), 3),
        ])
        .unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateLineItem { .. }));
    }

    #[test]
    fn transition_graph_moves_forward_only() {
        use RequestStatus::*;
        assert!(Draft.can_transition_to(PendingApproval));
        assert!(PendingApproval.can_transition_to(Approved));
        assert!(Approved.can_transition_to(PartiallyAllocated));
        assert!(PartiallyAllocated.can_transition_to(Allocated));

        assert!(!Approved.can_transition_to(Draft));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Allocated.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(PendingApproval));
    }

    #[test]
    fn invalid_transition_is_typed() {
        let mut request = make_request(vec![LineItem::material("cement", 5)]).unwrap();
        let err = request.transition_to(RequestStatus::Allocated).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(request.status, RequestStatus::Draft);
    }

    #[test]
    fn outstanding_tracks_allocations() {
        let mut request = make_request(vec![LineItem::material("cement", 10)]).unwrap();
        assert_eq!(request.total_outstanding(), 10);

        let allocation = Allocation::new(
            request.id.clone(),
            request.next_allocation_sequence(),
            ResourceKind::Material,
            ResourceId::new("cement"),
            4,
            SiteId::new("site-1"),
            ActorId::new("bob"),
        );
        request.allocations.push(allocation);

        assert_eq!(request.allocated_for(&ResourceId::new("cement")), 4);
        assert_eq!(request.total_outstanding(), 6);
        assert!(!request.fully_allocated());
        assert_eq!(request.next_allocation_sequence(), 2);
    }

    #[test]
    fn current_step_is_lowest_pending() {
        let mut request = make_request(vec![LineItem::material("cement", 5)]).unwrap();
        request.steps = vec![
            ApprovalStep::pending(request.id.clone(), DepartmentId::new("stores"), 1),
            ApprovalStep::pending(request.id.clone(), DepartmentId::new("finance"), 2),
        ];
        assert_eq!(request.current_step_order(), Some(1));

        request.step_mut(1).unwrap().freeze(StepStatus::Approved);
        assert_eq!(request.current_step_order(), Some(2));

        request.step_mut(2).unwrap().freeze(StepStatus::Approved);
        assert_eq!(request.current_step_order(), None);
        assert!(request.chain_approved());
    }
}
