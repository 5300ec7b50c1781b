//! Approval policy configuration
//!
//! The department precedence rule is deployment configuration, not code:
//! embedders supply the ordered list of departments that must approve
//! every request. The origin department never approves its own request.

use crate::DepartmentId;
use serde::{Deserialize, Serialize};

/// Configuration for approval chain materialization and allocation behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Ordered departments every request must pass, e.g. the resource-owning
    /// department before finance. The request's origin department is skipped.
    pub precedence: Vec<DepartmentId>,
    /// Whether full approval triggers allocation immediately.
    pub auto_allocate: bool,
    /// How many version-conflict retries a single ledger deduction attempts
    /// before the line is skipped for this run.
    pub deduct_retries: u32,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            precedence: Vec::new(),
            auto_allocate: true,
            deduct_retries: 8,
        }
    }
}

impl ApprovalPolicy {
    pub fn with_precedence(departments: Vec<DepartmentId>) -> Self {
        Self {
            precedence: departments,
            ..Self::default()
        }
    }

    /// The approval chain for a request from `origin`: the precedence list
    /// with the origin department removed, order preserved.
    pub fn chain_for(&self, origin: &DepartmentId) -> Vec<DepartmentId> {
        self.precedence
            .iter()
            .filter(|d| *d != origin)
            .cloned()
            .collect()
    }
}
