//! Assembly commands.

use std::collections::{HashMap, HashSet};

use common::{AssemblyId, OrderId};
use serde::Deserialize;

use super::{AssemblyError, PartId, PartMetadata};

/// Command to group parts into a named assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssembly {
    pub name: String,
    #[serde(default)]
    pub part_ids: Vec<PartId>,
    #[serde(default)]
    pub part_metadata: HashMap<PartId, PartMetadata>,
}

impl CreateAssembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_ids: Vec::new(),
            part_metadata: HashMap::new(),
        }
    }

    /// Adds a part with its metadata.
    pub fn with_part(mut self, part_id: impl Into<PartId>, metadata: PartMetadata) -> Self {
        let part_id = part_id.into();
        self.part_ids.push(part_id.clone());
        self.part_metadata.insert(part_id, metadata);
        self
    }

    /// Checks the whole command; nothing is written unless this passes.
    pub(crate) fn validate(&self) -> Result<(), AssemblyError> {
        if self.name.trim().is_empty() {
            return Err(AssemblyError::NameRequired);
        }
        if self.part_ids.is_empty() {
            return Err(AssemblyError::NoParts);
        }

        let mut seen = HashSet::new();
        if let Some(part_id) = self.part_ids.iter().find(|id| !seen.insert(*id)) {
            return Err(AssemblyError::DuplicatePart {
                part_id: part_id.clone(),
            });
        }
        if self.part_ids.len() != self.part_metadata.len() {
            return Err(AssemblyError::PartCountMismatch {
                part_ids: self.part_ids.len(),
                metadata: self.part_metadata.len(),
            });
        }
        for part_id in &self.part_ids {
            let metadata = self.part_metadata.get(part_id).ok_or_else(|| {
                AssemblyError::MissingPartMetadata {
                    part_id: part_id.clone(),
                }
            })?;
            if metadata.storage_path.trim().is_empty() {
                return Err(AssemblyError::StoragePathRequired {
                    part_id: part_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Command replacing the build order of every assembly in an order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderAssemblies {
    pub assembly_ids: Vec<AssemblyId>,
}

/// Command to record the specification of one part.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveSpecification {
    pub order_id: OrderId,
    pub part_id: PartId,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub specification: Option<serde_json::Value>,
}

impl SaveSpecification {
    /// Returns the effective quantity and payload.
    pub(crate) fn validate(&self) -> Result<(u32, serde_json::Value), AssemblyError> {
        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(AssemblyError::InvalidQuantity { quantity });
        }
        match &self.specification {
            None | Some(serde_json::Value::Null) => Err(AssemblyError::SpecificationRequired),
            Some(payload) => Ok((quantity, payload.clone())),
        }
    }
}

/// Command to flag an assembly's specifications as complete or not.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetSpecificationStatus {
    pub completed: bool,
}
