//! Assembly, part and specification records.

use chrono::{DateTime, Utc};
use common::{AssemblyId, OrderId, SpecificationId};
use record_store::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parts::summarize_path;

/// Namespace for ids derived from (order, assembly, part).
const PART_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_4f70_9a51_c2e8_7d40_b913);

/// Identifier of a split part, as chosen by the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(String);

impl PartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PartId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Client-supplied description of a part being grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartMetadata {
    pub storage_path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hierarchy: Vec<String>,
}

impl PartMetadata {
    pub fn from_path(storage_path: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            name: None,
            hierarchy: Vec::new(),
        }
    }
}

/// A named group of parts within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: AssemblyId,
    pub order_id: OrderId,
    pub name: String,
    pub build_order: Option<u32>,
    pub specifications_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Assembly {
    const COLLECTION: &'static str = "assemblies";

    fn entity_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Assembly {
    pub fn new(order_id: OrderId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AssemblyId::new(),
            order_id,
            name: name.into(),
            build_order: None,
            specifications_completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Membership of one part in an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyPart {
    pub id: Uuid,
    pub assembly_id: AssemblyId,
    pub order_id: OrderId,
    /// Insertion position within the assembly.
    pub position: u32,
    pub part_id: PartId,
    pub name: String,
    pub storage_path: String,
    pub hierarchy: Vec<String>,
}

impl Entity for AssemblyPart {
    const COLLECTION: &'static str = "assembly_parts";

    fn entity_id(&self) -> Uuid {
        self.id
    }
}

impl AssemblyPart {
    /// Resolves metadata into a part record, deriving name and hierarchy
    /// from the storage path where they are missing.
    pub fn resolve(
        assembly: &Assembly,
        position: u32,
        part_id: PartId,
        metadata: PartMetadata,
    ) -> Self {
        let derived = summarize_path(&metadata.storage_path);
        let name = metadata
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(derived.name);
        let hierarchy = if metadata.hierarchy.is_empty() {
            derived.hierarchy
        } else {
            metadata.hierarchy
        };

        Self {
            id: Uuid::new_v5(
                &PART_NAMESPACE,
                format!("{}/{}", assembly.id, part_id).as_bytes(),
            ),
            assembly_id: assembly.id,
            order_id: assembly.order_id,
            position,
            part_id,
            name,
            storage_path: metadata.storage_path,
            hierarchy,
        }
    }
}

/// An assembly together with its parts in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyWithParts {
    #[serde(flatten)]
    pub assembly: Assembly,
    pub parts: Vec<AssemblyPart>,
}

/// Manufacturing details for one part of an assembly.
///
/// There is at most one per (order, assembly, part); saving again overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpecification {
    pub id: SpecificationId,
    pub order_id: OrderId,
    pub assembly_id: AssemblyId,
    pub part_id: PartId,
    pub quantity: u32,
    pub specification: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PartSpecification {
    const COLLECTION: &'static str = "part_specifications";

    fn entity_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl PartSpecification {
    /// Deterministic id of the specification for a part.
    pub fn id_for(order_id: OrderId, assembly_id: AssemblyId, part_id: &PartId) -> SpecificationId {
        let key = format!("{order_id}/{assembly_id}/{part_id}");
        SpecificationId::from_uuid(Uuid::new_v5(&PART_NAMESPACE, key.as_bytes()))
    }
}
