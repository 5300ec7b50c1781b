//! Error taxonomy for the requisition workflow
//!
//! Every failure the engine can surface is a variant here, carrying the
//! identifiers a caller needs to act on it. [`WorkflowError::kind`] collapses
//! the variants into the coarse categories the UI/API boundary branches on.

use crate::{LedgerKey, RequestId, RequestStatus, ResourceId, StepStatus};

/// Errors that can occur in requisition workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("request has no line items")]
    EmptyLineItems,

    #[error("line item for resource {resource_id} has zero quantity")]
    ZeroQuantity { resource_id: ResourceId },

    #[error("duplicate line item for resource {resource_id}")]
    DuplicateLineItem { resource_id: ResourceId },

    #[error("request {request_id} is {status:?}, expected {expected}")]
    InvalidState {
        request_id: RequestId,
        status: RequestStatus,
        expected: &'static str,
    },

    #[error("request {request_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        request_id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("step {attempted} of request {request_id} is not actionable, current step is {current}")]
    OutOfOrder {
        request_id: RequestId,
        attempted: u32,
        current: u32,
    },

    #[error("step {order} of request {request_id} was already decided ({status:?})")]
    AlreadyDecided {
        request_id: RequestId,
        order: u32,
        status: StepStatus,
    },

    #[error("request {request_id} has no approval step {order}")]
    StepNotFound { request_id: RequestId, order: u32 },

    #[error("no inventory available for any outstanding line item of request {request_id}")]
    InsufficientInventory { request_id: RequestId },

    #[error("ledger entry {key} holds {available} available, {requested} requested")]
    InsufficientAvailable {
        key: LedgerKey,
        requested: u64,
        available: u64,
    },

    #[error("request {request_id} not found")]
    RequestNotFound { request_id: RequestId },

    #[error("request {request_id} already exists")]
    DuplicateRequest { request_id: RequestId },

    #[error("ledger entry {key} not found")]
    LedgerEntryNotFound { key: LedgerKey },

    #[error("stale {entity} {id}: expected version {expected}, stored version is {actual}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("storage lock poisoned")]
    Lock,
}

/// Coarse error categories for the UI/API boundary.
///
/// `Validation` and `InvalidState` surface as form/action errors,
/// `InsufficientInventory` as "partially fulfilled, retry later", and
/// `ConcurrencyConflict` as refresh-and-retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    OutOfOrder,
    AlreadyDecided,
    InsufficientInventory,
    ConcurrencyConflict,
    NotFound,
    Internal,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::EmptyLineItems
            | WorkflowError::ZeroQuantity { .. }
            | WorkflowError::DuplicateLineItem { .. } => ErrorKind::Validation,
            WorkflowError::InvalidState { .. } | WorkflowError::InvalidTransition { .. } => {
                ErrorKind::InvalidState
            }
            WorkflowError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            WorkflowError::AlreadyDecided { .. } => ErrorKind::AlreadyDecided,
            WorkflowError::InsufficientInventory { .. }
            | WorkflowError::InsufficientAvailable { .. } => ErrorKind::InsufficientInventory,
            WorkflowError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            WorkflowError::RequestNotFound { .. }
            | WorkflowError::StepNotFound { .. }
            | WorkflowError::LedgerEntryNotFound { .. } => ErrorKind::NotFound,
            WorkflowError::DuplicateRequest { .. } => ErrorKind::Validation,
            WorkflowError::Lock => ErrorKind::Internal,
        }
    }

    /// Whether a caller may resubmit the same operation after refreshing
    /// state (concurrency losers) or after inventory changes (shortfalls).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::InsufficientInventory
        )
    }
}

/// Result type alias for requisition workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_kind() {
        let err = WorkflowError::ZeroQuantity {
            resource_id: ResourceId::new("m-1"),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn conflict_is_retryable() {
        let err = WorkflowError::ConcurrencyConflict {
            entity: "request",
            id: "r-1".into(),
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(err.is_retryable());
    }

    #[test]
    fn shortfall_is_retryable() {
        let err = WorkflowError::InsufficientInventory {
            request_id: RequestId::new("r-1"),
        };
        assert!(err.is_retryable());
    }
}
