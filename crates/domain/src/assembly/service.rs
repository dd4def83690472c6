//! Assembly service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use common::{AssemblyId, OrderId};
use record_store::{RecordQuery, RecordStore, RecordStoreExt, Stored, WriteBatch};
use serde_json::json;

use crate::error::DomainError;
use crate::events::{DomainEvent, MarketEvent};
use crate::order::{Order, load_order};
use crate::value_objects::Actor;

use super::{
    Assembly, AssemblyError, AssemblyPart, AssemblyWithParts, CreateAssembly, PartSpecification,
    ReorderAssemblies, SaveSpecification,
};

fn ensure_participant(order: &Order, actor: &Actor, action: &'static str) -> Result<(), DomainError> {
    let user = actor.user_id();
    if actor.is_admin() || order.is_owned_by(user) || order.is_manufactured_by(user) {
        Ok(())
    } else {
        Err(DomainError::Forbidden { action })
    }
}

/// Service for assemblies, their parts and part specifications.
pub struct AssemblyService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> AssemblyService<S> {
    /// Creates a new assembly service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load_assembly(&self, assembly_id: AssemblyId) -> Result<Stored<Assembly>, DomainError> {
        self.store
            .load::<Assembly>(assembly_id.as_uuid())
            .await?
            .ok_or_else(|| DomainError::not_found("assembly", assembly_id))
    }

    async fn assemblies_of(&self, order_id: OrderId) -> Result<Vec<Stored<Assembly>>, DomainError> {
        let query = RecordQuery::of::<Assembly>().filter("order_id", json!(order_id));
        Ok(self.store.find::<Assembly>(query).await?)
    }

    /// Groups parts into a new assembly.
    ///
    /// The command is fully validated first; the assembly and all its parts
    /// are then written in one batch.
    #[tracing::instrument(skip(self, cmd, actor), fields(name = %cmd.name, parts = cmd.part_ids.len()))]
    pub async fn create_assembly(
        &self,
        order_id: OrderId,
        cmd: CreateAssembly,
        actor: &Actor,
    ) -> Result<AssemblyWithParts, DomainError> {
        cmd.validate()?;
        let Stored {
            entity: mut order,
            version: order_version,
        } = load_order(&self.store, order_id).await?;
        ensure_participant(&order, actor, "create assemblies for this order")?;

        let CreateAssembly {
            name,
            part_ids,
            mut part_metadata,
        } = cmd;
        let now = Utc::now();
        let assembly = Assembly::new(order_id, name.trim(), now);

        let mut parts = Vec::with_capacity(part_ids.len());
        for (position, part_id) in (0u32..).zip(part_ids) {
            let metadata = part_metadata.remove(&part_id).ok_or_else(|| {
                AssemblyError::MissingPartMetadata {
                    part_id: part_id.clone(),
                }
            })?;
            parts.push(AssemblyPart::resolve(&assembly, position, part_id, metadata));
        }

        let event = MarketEvent::AssemblyCreated {
            order_id,
            assembly_id: assembly.id,
            name: assembly.name.clone(),
            part_count: parts.len(),
        };
        // Touching the order serializes this against a concurrent reorder.
        order.updated_at = now;
        let mut batch = WriteBatch::new()
            .update(&order, order_version)?
            .insert(&assembly)?;
        for part in &parts {
            batch = batch.insert(part)?;
        }
        self.store
            .commit(batch.event(event.to_outbox()?))
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order_id, "create assembly"))?;

        tracing::info!(assembly_id = %assembly.id, "assembly created");
        Ok(AssemblyWithParts { assembly, parts })
    }

    /// Every assembly of an order with its parts.
    ///
    /// Sequenced assemblies come first by build order, the rest by creation.
    #[tracing::instrument(skip(self))]
    pub async fn list_assemblies_with_parts(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<AssemblyWithParts>, DomainError> {
        load_order(&self.store, order_id).await?;

        let mut assemblies: Vec<Assembly> = self
            .assemblies_of(order_id)
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect();
        assemblies.sort_by_key(|a| (a.build_order.is_none(), a.build_order, a.created_at));

        let query = RecordQuery::of::<AssemblyPart>().filter("order_id", json!(order_id));
        let mut parts_by_assembly: HashMap<AssemblyId, Vec<AssemblyPart>> = HashMap::new();
        for part in self.store.find::<AssemblyPart>(query).await? {
            let part = part.into_inner();
            parts_by_assembly
                .entry(part.assembly_id)
                .or_default()
                .push(part);
        }

        Ok(assemblies
            .into_iter()
            .map(|assembly| {
                let mut parts = parts_by_assembly.remove(&assembly.id).unwrap_or_default();
                parts.sort_by_key(|part| part.position);
                AssemblyWithParts { assembly, parts }
            })
            .collect())
    }

    /// Replaces the build order of all assemblies of an order.
    ///
    /// The list must name every assembly of the order exactly once; they are
    /// numbered `0..n` in list order within one batch.
    #[tracing::instrument(skip(self, cmd, actor), fields(count = cmd.assembly_ids.len()))]
    pub async fn reorder_assemblies(
        &self,
        order_id: OrderId,
        cmd: ReorderAssemblies,
        actor: &Actor,
    ) -> Result<Vec<AssemblyWithParts>, DomainError> {
        let Stored {
            entity: mut order,
            version: order_version,
        } = load_order(&self.store, order_id).await?;
        ensure_participant(&order, actor, "reorder assemblies for this order")?;

        if cmd.assembly_ids.is_empty() {
            return Err(AssemblyError::EmptyBuildOrder.into());
        }

        let mut current: HashMap<AssemblyId, Stored<Assembly>> = self
            .assemblies_of(order_id)
            .await?
            .into_iter()
            .map(|stored| (stored.entity.id, stored))
            .collect();

        let mut seen = HashSet::new();
        for assembly_id in &cmd.assembly_ids {
            if !seen.insert(*assembly_id) {
                return Err(AssemblyError::DuplicateAssembly {
                    assembly_id: *assembly_id,
                }
                .into());
            }
            if !current.contains_key(assembly_id) {
                return Err(AssemblyError::UnknownAssembly {
                    assembly_id: *assembly_id,
                }
                .into());
            }
        }
        if cmd.assembly_ids.len() != current.len() {
            return Err(AssemblyError::IncompleteBuildOrder {
                expected: current.len(),
                supplied: cmd.assembly_ids.len(),
            }
            .into());
        }

        let now = Utc::now();
        order.updated_at = now;
        let mut batch = WriteBatch::new().update(&order, order_version)?;
        for (position, assembly_id) in (0u32..).zip(&cmd.assembly_ids) {
            if let Some(Stored { entity, version }) = current.remove(assembly_id) {
                let mut assembly = entity;
                assembly.build_order = Some(position);
                assembly.updated_at = now;
                batch = batch.update(&assembly, version)?;
            }
        }
        let event = MarketEvent::AssembliesReordered {
            order_id,
            assembly_ids: cmd.assembly_ids.clone(),
        };
        self.store
            .commit(batch.event(event.to_outbox()?))
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order_id, "reorder assemblies"))?;

        tracing::info!("assemblies reordered");
        self.list_assemblies_with_parts(order_id).await
    }

    /// Creates or overwrites the specification of a part.
    #[tracing::instrument(skip(self, cmd, actor), fields(part_id = %cmd.part_id))]
    pub async fn save_specification(
        &self,
        assembly_id: AssemblyId,
        cmd: SaveSpecification,
        actor: &Actor,
    ) -> Result<PartSpecification, DomainError> {
        let (quantity, payload) = cmd.validate()?;

        let assembly = self.load_assembly(assembly_id).await?.into_inner();
        if assembly.order_id != cmd.order_id {
            return Err(AssemblyError::AssemblyNotInOrder {
                assembly_id,
                order_id: cmd.order_id,
            }
            .into());
        }
        let order = load_order(&self.store, cmd.order_id).await?.into_inner();
        ensure_participant(&order, actor, "specify parts for this order")?;

        let membership = RecordQuery::of::<AssemblyPart>()
            .filter("assembly_id", json!(assembly_id))
            .filter("part_id", json!(cmd.part_id))
            .limit(1);
        if self.store.query(membership).await?.is_empty() {
            return Err(AssemblyError::PartNotInAssembly {
                part_id: cmd.part_id,
                assembly_id,
            }
            .into());
        }

        let now = Utc::now();
        let id = PartSpecification::id_for(cmd.order_id, assembly_id, &cmd.part_id);
        let (specification, batch) = match self.store.load::<PartSpecification>(id.as_uuid()).await? {
            Some(Stored {
                entity: mut existing,
                version,
            }) => {
                existing.quantity = quantity;
                existing.specification = payload;
                existing.updated_at = now;
                let batch = WriteBatch::new().update(&existing, version)?;
                (existing, batch)
            }
            None => {
                let created = PartSpecification {
                    id,
                    order_id: cmd.order_id,
                    assembly_id,
                    part_id: cmd.part_id,
                    quantity,
                    specification: payload,
                    created_at: now,
                    updated_at: now,
                };
                let batch = WriteBatch::new().insert(&created)?;
                (created, batch)
            }
        };
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "specification", id, "save specification"))?;

        Ok(specification)
    }

    /// Specifications recorded for an assembly, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_specifications(
        &self,
        assembly_id: AssemblyId,
    ) -> Result<Vec<PartSpecification>, DomainError> {
        self.load_assembly(assembly_id).await?;

        let query =
            RecordQuery::of::<PartSpecification>().filter("assembly_id", json!(assembly_id));
        let mut specifications: Vec<PartSpecification> = self
            .store
            .find::<PartSpecification>(query)
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect();
        specifications.sort_by_key(|spec| spec.created_at);
        Ok(specifications)
    }

    /// Sets the specifications-completed flag. The flag is trusted as given.
    #[tracing::instrument(skip(self, actor))]
    pub async fn set_specification_status(
        &self,
        assembly_id: AssemblyId,
        completed: bool,
        actor: &Actor,
    ) -> Result<Assembly, DomainError> {
        let Stored {
            entity: mut assembly,
            version,
        } = self.load_assembly(assembly_id).await?;
        let order = load_order(&self.store, assembly.order_id).await?.into_inner();
        ensure_participant(&order, actor, "update assemblies for this order")?;

        if assembly.specifications_completed == completed {
            return Ok(assembly);
        }
        assembly.specifications_completed = completed;
        assembly.updated_at = Utc::now();

        self.store
            .commit(WriteBatch::new().update(&assembly, version)?)
            .await
            .map_err(|e| {
                DomainError::from_commit(e, "assembly", assembly_id, "set specification status")
            })?;
        Ok(assembly)
    }

    /// Loads an assembly by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_assembly(&self, assembly_id: AssemblyId) -> Result<Assembly, DomainError> {
        Ok(self.load_assembly(assembly_id).await?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{PartId, PartMetadata};
    use crate::error::ErrorKind;
    use crate::order::{CreateOrderDraft, OrderService};
    use crate::value_objects::{AccountType, Contact};
    use chrono::Duration;
    use common::UserId;
    use record_store::InMemoryRecordStore;

    struct Fixture {
        store: InMemoryRecordStore,
        service: AssemblyService<InMemoryRecordStore>,
        creator: Actor,
        order: Order,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryRecordStore::new();
        let creator = Actor::new(
            Contact::new(UserId::new(), "Ada", "ada@example.com"),
            AccountType::Creator,
        );
        let due = (Utc::now() + Duration::days(7)).date_naive();
        let order = OrderService::new(store.clone())
            .create_draft(CreateOrderDraft::new("Gearbox", 2, due), &creator)
            .await
            .unwrap();
        Fixture {
            service: AssemblyService::new(store.clone()),
            store,
            creator,
            order,
        }
    }

    fn parts(name: &str, ids: &[&str]) -> CreateAssembly {
        ids.iter().fold(CreateAssembly::new(name), |cmd, id| {
            cmd.with_part(*id, PartMetadata::from_path(format!("bucket/{name}/{id}.step")))
        })
    }

    #[tokio::test]
    async fn test_create_assembly_resolves_all_parts() {
        let f = fixture().await;
        let created = f
            .service
            .create_assembly(f.order.id, parts("gearbox", &["a", "b", "c"]), &f.creator)
            .await
            .unwrap();

        assert_eq!(created.parts.len(), 3);
        assert_eq!(created.parts[2].name, "c.step");
        assert_eq!(created.parts[2].hierarchy, vec!["bucket", "gearbox"]);
        assert_eq!(created.assembly.build_order, None);
    }

    #[tokio::test]
    async fn test_mismatched_metadata_writes_nothing() {
        let f = fixture().await;

        let mut cmd = parts("gearbox", &["a", "b", "c"]);
        cmd.part_metadata.remove(&PartId::new("b"));
        let err = f
            .service
            .create_assembly(f.order.id, cmd, &f.creator)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let listed = f.service.list_assemblies_with_parts(f.order.id).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(f.store.record_count("assemblies").await, 0);
        assert_eq!(f.store.record_count("assembly_parts").await, 0);
    }

    #[tokio::test]
    async fn test_reorder_assigns_sequential_build_order() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let created = f
                .service
                .create_assembly(f.order.id, parts(name, &["p"]), &f.creator)
                .await
                .unwrap();
            ids.push(created.assembly.id);
        }
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let listed = f
            .service
            .reorder_assemblies(
                f.order.id,
                ReorderAssemblies {
                    assembly_ids: vec![a, b, c],
                },
                &f.creator,
            )
            .await
            .unwrap();
        let order: Vec<_> = listed
            .iter()
            .map(|x| (x.assembly.id, x.assembly.build_order))
            .collect();
        assert_eq!(order, vec![(a, Some(0)), (b, Some(1)), (c, Some(2))]);

        let listed = f
            .service
            .reorder_assemblies(
                f.order.id,
                ReorderAssemblies {
                    assembly_ids: vec![c, a, b],
                },
                &f.creator,
            )
            .await
            .unwrap();
        let order: Vec<_> = listed
            .iter()
            .map(|x| (x.assembly.id, x.assembly.build_order))
            .collect();
        assert_eq!(order, vec![(c, Some(0)), (a, Some(1)), (b, Some(2))]);
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_reorder_rejects_bad_lists() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let created = f
                .service
                .create_assembly(f.order.id, parts(name, &["p"]), &f.creator)
                .await
                .unwrap();
            ids.push(created.assembly.id);
        }

        for bad in [
            vec![],
            vec![ids[0]],
            vec![ids[0], ids[0]],
            vec![ids[0], AssemblyId::new()],
        ] {
            let err = f
                .service
                .reorder_assemblies(f.order.id, ReorderAssemblies { assembly_ids: bad }, &f.creator)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        let listed = f.service.list_assemblies_with_parts(f.order.id).await.unwrap();
        assert!(listed.iter().all(|x| x.assembly.build_order.is_none()));
    }

    #[tokio::test]
    async fn test_save_specification_upserts() {
        let f = fixture().await;
        let created = f
            .service
            .create_assembly(f.order.id, parts("gearbox", &["a", "b"]), &f.creator)
            .await
            .unwrap();
        let assembly_id = created.assembly.id;

        let save = |quantity: Option<u32>, material: &str| SaveSpecification {
            order_id: f.order.id,
            part_id: PartId::new("a"),
            quantity,
            specification: Some(json!({ "material": material })),
        };

        let first = f
            .service
            .save_specification(assembly_id, save(None, "steel"), &f.creator)
            .await
            .unwrap();
        assert_eq!(first.quantity, 1);

        let second = f
            .service
            .save_specification(assembly_id, save(Some(4), "brass"), &f.creator)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);

        let specs = f.service.list_specifications(assembly_id).await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].quantity, 4);
        assert_eq!(specs[0].specification["material"], "brass");
    }

    #[tokio::test]
    async fn test_save_specification_rejects_foreign_parts() {
        let f = fixture().await;
        let created = f
            .service
            .create_assembly(f.order.id, parts("gearbox", &["a"]), &f.creator)
            .await
            .unwrap();

        let cmd = SaveSpecification {
            order_id: f.order.id,
            part_id: PartId::new("zzz"),
            quantity: None,
            specification: Some(json!({})),
        };
        let err = f
            .service
            .save_specification(created.assembly.id, cmd.clone(), &f.creator)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = f
            .service
            .save_specification(
                created.assembly.id,
                SaveSpecification {
                    order_id: OrderId::new(),
                    ..cmd
                },
                &f.creator,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_set_specification_status() {
        let f = fixture().await;
        let created = f
            .service
            .create_assembly(f.order.id, parts("gearbox", &["a"]), &f.creator)
            .await
            .unwrap();

        let assembly = f
            .service
            .set_specification_status(created.assembly.id, true, &f.creator)
            .await
            .unwrap();
        assert!(assembly.specifications_completed);

        let stranger = Actor::new(
            Contact::new(UserId::new(), "Eve", "eve@example.com"),
            AccountType::Manufacturer,
        );
        let err = f
            .service
            .set_specification_status(created.assembly.id, false, &stranger)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
