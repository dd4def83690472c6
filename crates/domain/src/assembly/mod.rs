//! Assemblies: grouping CAD-derived parts and capturing per-part specifications.

mod commands;
mod entity;
mod parts;
mod service;

pub use commands::{CreateAssembly, ReorderAssemblies, SaveSpecification, SetSpecificationStatus};
pub use entity::{Assembly, AssemblyPart, AssemblyWithParts, PartId, PartMetadata, PartSpecification};
pub use parts::{PartSummary, RawPart, SplitData, SplitResponse, SplitResult, normalize_split_response, summarize_path};
pub use service::AssemblyService;

use common::{AssemblyId, OrderId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during assembly operations.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Assembly name is required")]
    NameRequired,

    #[error("An assembly needs at least one part")]
    NoParts,

    /// Part ids and metadata must pair up exactly.
    #[error("Got {part_ids} part ids but {metadata} metadata entries")]
    PartCountMismatch { part_ids: usize, metadata: usize },

    #[error("No metadata supplied for part {part_id}")]
    MissingPartMetadata { part_id: PartId },

    #[error("Part {part_id} is listed more than once")]
    DuplicatePart { part_id: PartId },

    #[error("Part {part_id} has no storage path")]
    StoragePathRequired { part_id: PartId },

    #[error("Build order must list every assembly of the order")]
    EmptyBuildOrder,

    #[error("Build order lists {supplied} assemblies but the order has {expected}")]
    IncompleteBuildOrder { expected: usize, supplied: usize },

    #[error("Assembly {assembly_id} does not belong to this order")]
    UnknownAssembly { assembly_id: AssemblyId },

    #[error("Assembly {assembly_id} is listed more than once")]
    DuplicateAssembly { assembly_id: AssemblyId },

    #[error("Assembly {assembly_id} does not belong to order {order_id}")]
    AssemblyNotInOrder {
        assembly_id: AssemblyId,
        order_id: OrderId,
    },

    #[error("Part {part_id} is not in assembly {assembly_id}")]
    PartNotInAssembly {
        part_id: PartId,
        assembly_id: AssemblyId,
    },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Specification details are required")]
    SpecificationRequired,

    /// The CAD service answered with something other than a part list.
    #[error("Malformed CAD split response: {0}")]
    MalformedSplitResponse(String),
}

impl AssemblyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssemblyError::EmptyBuildOrder
            | AssemblyError::IncompleteBuildOrder { .. }
            | AssemblyError::UnknownAssembly { .. }
            | AssemblyError::DuplicateAssembly { .. } => ErrorKind::Conflict,
            AssemblyError::AssemblyNotInOrder { .. } => ErrorKind::NotFound,
            AssemblyError::MalformedSplitResponse(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Validation,
        }
    }
}
