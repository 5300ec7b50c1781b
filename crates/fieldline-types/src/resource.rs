//! Resource kinds and request line items
//!
//! The three resource kinds are a closed set. Materials are counted in
//! stock units, labor in hours, equipment in machine-hours; the ledger
//! does not care which, it only tracks quantities per kind and resource.

use crate::ResourceId;
use serde::{Deserialize, Serialize};

/// The closed set of resource kinds a request may demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Material,
    Labor,
    Equipment,
}

impl ResourceKind {
    /// The unit label shown on line items of this kind.
    pub fn unit(&self) -> &'static str {
        match self {
            ResourceKind::Material => "units",
            ResourceKind::Labor => "hours",
            ResourceKind::Equipment => "machine-hours",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Material => write!(f, "material"),
            ResourceKind::Labor => write!(f, "labor"),
            ResourceKind::Equipment => write!(f, "equipment"),
        }
    }
}

/// A single `(kind, resource, quantity)` demand within a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Which kind of resource is demanded
    pub kind: ResourceKind,
    /// The resource being demanded
    pub resource_id: ResourceId,
    /// Requested quantity, in the kind's unit
    pub quantity: u64,
}

impl LineItem {
    pub fn new(kind: ResourceKind, resource_id: ResourceId, quantity: u64) -> Self {
        Self {
            kind,
            resource_id,
            quantity,
        }
    }

    pub fn material(resource_id: impl Into<String>, quantity: u64) -> Self {
        Self::new(ResourceKind::Material, ResourceId::new(resource_id), quantity)
    }

    pub fn labor(resource_id: impl Into<String>, quantity: u64) -> Self {
        Self::new(ResourceKind::Labor, ResourceId::new(resource_id), quantity)
    }

    pub fn equipment(resource_id: impl Into<String>, quantity: u64) -> Self {
        Self::new(ResourceKind::Equipment, ResourceId::new(resource_id), quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ResourceKind::Equipment).unwrap();
        assert_eq!(json, "\"equipment\"");
    }

    #[test]
    fn unit_labels() {
        assert_eq!(ResourceKind::Material.unit(), "units");
        assert_eq!(ResourceKind::Labor.unit(), "hours");
    }
}
