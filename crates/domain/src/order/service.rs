//! Order service providing the order lifecycle operations.

use chrono::Utc;
use common::{OrderId, UserId};
use record_store::{RecordQuery, RecordStore, RecordStoreExt, Stored, WriteBatch};
use serde_json::json;

use crate::error::DomainError;
use crate::events::{DomainEvent, MarketEvent};
use crate::value_objects::{AccountType, Actor};

use super::{AdvanceStatus, CreateOrderDraft, Order, OrderStatus, ShippingDetails, StatusMachine, UpdateShipping};

/// Loads an order or fails with `NotFound`.
pub(crate) async fn load_order<S: RecordStore>(
    store: &S,
    order_id: OrderId,
) -> Result<Stored<Order>, DomainError> {
    store
        .load::<Order>(order_id.as_uuid())
        .await?
        .ok_or_else(|| DomainError::not_found("order", order_id))
}

fn sorted(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by_key(|order| order.created_at);
    orders
}

/// Service for managing orders.
///
/// Every mutation is a conditional write on the order's version, committed
/// together with the event describing it.
pub struct OrderService<S: RecordStore> {
    store: S,
    machine: StatusMachine,
}

impl<S: RecordStore> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            machine: StatusMachine::default(),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drafts a new order owned by the calling creator.
    #[tracing::instrument(skip(self, cmd), fields(title = %cmd.title))]
    pub async fn create_draft(
        &self,
        cmd: CreateOrderDraft,
        actor: &Actor,
    ) -> Result<Order, DomainError> {
        if !matches!(actor.account_type, AccountType::Creator | AccountType::Admin) {
            return Err(DomainError::Forbidden {
                action: "create orders",
            });
        }

        let order = Order::draft(cmd, actor.contact.clone(), Utc::now())?;
        let event = MarketEvent::OrderCreated {
            order: (&order).into(),
        };
        let batch = WriteBatch::new().insert(&order)?.event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order.id, "create draft"))?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, "order drafted");
        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        Ok(load_order(&self.store, order_id).await?.into_inner())
    }

    /// Orders with no manufacturer that are not archived, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_unclaimed(&self) -> Result<Vec<Order>, DomainError> {
        let query = RecordQuery::of::<Order>()
            .filter("manufacturer", serde_json::Value::Null)
            .filter("is_archived", json!(false));
        self.find(query).await
    }

    /// Orders created by `user`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_creator(&self, user: UserId) -> Result<Vec<Order>, DomainError> {
        let query = RecordQuery::of::<Order>().filter("creator.user_id", json!(user));
        self.find(query).await
    }

    /// Orders claimed by `user`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_manufacturer(&self, user: UserId) -> Result<Vec<Order>, DomainError> {
        let query = RecordQuery::of::<Order>().filter("manufacturer.user_id", json!(user));
        self.find(query).await
    }

    async fn find(&self, query: RecordQuery) -> Result<Vec<Order>, DomainError> {
        let orders = self
            .store
            .find::<Order>(query)
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect();
        Ok(sorted(orders))
    }

    /// Moves a claimed order to its next manufacturing stage.
    #[tracing::instrument(skip(self, cmd, actor), fields(actor = %actor.user_id()))]
    pub async fn advance_status(
        &self,
        order_id: OrderId,
        cmd: AdvanceStatus,
        actor: &Actor,
    ) -> Result<Order, DomainError> {
        let Stored {
            entity: mut order,
            version,
        } = load_order(&self.store, order_id).await?;

        if !actor.is_admin() && !order.is_manufactured_by(actor.user_id()) {
            return Err(DomainError::Forbidden {
                action: "advance this order",
            });
        }

        let shipping = cmd.shipping;
        let (from, to) = order.advance(&self.machine, shipping, Utc::now())?;

        let event = if to == OrderStatus::Shipped {
            MarketEvent::OrderShipped {
                order: (&order).into(),
                shipping: order.shipping_info.clone(),
            }
        } else {
            MarketEvent::OrderStatusAdvanced {
                order: (&order).into(),
                from,
                to,
            }
        };
        let batch = WriteBatch::new()
            .update(&order, version)?
            .event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order_id, "advance status"))?;

        tracing::info!(%from, %to, "order advanced");
        Ok(order)
    }

    /// Updates delivery address and carrier details.
    #[tracing::instrument(skip(self, cmd, actor), fields(actor = %actor.user_id()))]
    pub async fn update_shipping(
        &self,
        order_id: OrderId,
        cmd: UpdateShipping,
        actor: &Actor,
    ) -> Result<ShippingDetails, DomainError> {
        let Stored {
            entity: mut order,
            version,
        } = load_order(&self.store, order_id).await?;

        let user = actor.user_id();
        if !actor.is_admin() && !order.is_owned_by(user) && !order.is_manufactured_by(user) {
            return Err(DomainError::Forbidden {
                action: "update shipping for this order",
            });
        }

        let changes = order.update_shipping(cmd, Utc::now())?;
        if changes.is_empty() {
            return Ok(shipping_details(&order));
        }

        let event = MarketEvent::OrderUpdated {
            order: (&order).into(),
            recipient: order.counterpart_of(user),
            changes,
        };
        let batch = WriteBatch::new()
            .update(&order, version)?
            .event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order_id, "update shipping"))?;

        Ok(shipping_details(&order))
    }

    /// Returns the delivery view of an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_shipping(&self, order_id: OrderId) -> Result<ShippingDetails, DomainError> {
        let order = self.get_order(order_id).await?;
        Ok(shipping_details(&order))
    }

    /// Archives an order. Archiving twice is a no-op.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn archive_order(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<Order, DomainError> {
        let Stored {
            entity: mut order,
            version,
        } = load_order(&self.store, order_id).await?;

        if !actor.acts_for(order.creator.user_id) {
            return Err(DomainError::Forbidden {
                action: "archive this order",
            });
        }
        if !order.archive(Utc::now()) {
            return Ok(order);
        }

        let event = MarketEvent::OrderArchived {
            order: (&order).into(),
        };
        let batch = WriteBatch::new()
            .update(&order, version)?
            .event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order_id, "archive"))?;

        tracing::info!("order archived");
        Ok(order)
    }
}

fn shipping_details(order: &Order) -> ShippingDetails {
    ShippingDetails {
        order_id: order.id,
        status: order.status,
        delivery_address: order.delivery_address.clone(),
        shipping_info: order.shipping_info.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value_objects::{Address, Contact, ShippingInfo};
    use chrono::{Duration, NaiveDate};
    use record_store::InMemoryRecordStore;

    fn actor(account_type: AccountType) -> Actor {
        Actor::new(
            Contact::new(UserId::new(), "User", "user@example.com"),
            account_type,
        )
    }

    fn due() -> NaiveDate {
        (Utc::now() + Duration::days(14)).date_naive()
    }

    #[tokio::test]
    async fn test_create_draft_persists_and_emits_event() {
        let store = InMemoryRecordStore::new();
        let service = OrderService::new(store.clone());
        let creator = actor(AccountType::Creator);

        let order = service
            .create_draft(CreateOrderDraft::new("Bracket", 4, due()), &creator)
            .await
            .unwrap();

        let loaded = service.get_order(order.id).await.unwrap();
        assert_eq!(loaded, order);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_manufacturer_cannot_create_draft() {
        let service = OrderService::new(InMemoryRecordStore::new());
        let result = service
            .create_draft(
                CreateOrderDraft::new("Bracket", 4, due()),
                &actor(AccountType::Manufacturer),
            )
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_get_unknown_order_is_not_found() {
        let service = OrderService::new(InMemoryRecordStore::new());
        let err = service.get_order(OrderId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_unclaimed_excludes_archived_in_creation_order() {
        let service = OrderService::new(InMemoryRecordStore::new());
        let creator = actor(AccountType::Creator);

        let mut ids = Vec::new();
        for title in ["A", "B", "C"] {
            let order = service
                .create_draft(CreateOrderDraft::new(title, 1, due()), &creator)
                .await
                .unwrap();
            ids.push(order.id);
        }
        service.archive_order(ids[1], &creator).await.unwrap();

        let unclaimed: Vec<_> = service
            .list_unclaimed()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(unclaimed, vec![ids[0], ids[2]]);

        let mine = service.list_for_creator(creator.user_id()).await.unwrap();
        assert_eq!(mine.len(), 3);
    }

    #[tokio::test]
    async fn test_only_creator_or_admin_archives() {
        let service = OrderService::new(InMemoryRecordStore::new());
        let creator = actor(AccountType::Creator);
        let order = service
            .create_draft(CreateOrderDraft::new("Bracket", 1, due()), &creator)
            .await
            .unwrap();

        let err = service
            .archive_order(order.id, &actor(AccountType::Creator))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let archived = service
            .archive_order(order.id, &actor(AccountType::Admin))
            .await
            .unwrap();
        assert!(archived.is_archived);
    }

    #[tokio::test]
    async fn test_advance_unclaimed_order_is_forbidden_for_strangers() {
        let service = OrderService::new(InMemoryRecordStore::new());
        let order = service
            .create_draft(
                CreateOrderDraft::new("Bracket", 1, due()),
                &actor(AccountType::Creator),
            )
            .await
            .unwrap();

        let err = service
            .advance_status(order.id, AdvanceStatus::default(), &actor(AccountType::Manufacturer))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service
            .advance_status(order.id, AdvanceStatus::default(), &actor(AccountType::Admin))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_and_get_shipping() {
        let store = InMemoryRecordStore::new();
        let service = OrderService::new(store.clone());
        let creator = actor(AccountType::Creator);
        let order = service
            .create_draft(CreateOrderDraft::new("Bracket", 1, due()), &creator)
            .await
            .unwrap();

        let address = Address {
            street: "1 Forge Way".to_string(),
            city: "Pittsburgh".to_string(),
            state: "PA".to_string(),
            postal_code: "15201".to_string(),
            country: "US".to_string(),
        };
        let details = service
            .update_shipping(
                order.id,
                UpdateShipping {
                    delivery_address: Some(address.clone()),
                    shipping_info: Some(ShippingInfo {
                        carrier: "UPS".to_string(),
                        tracking_number: None,
                    }),
                },
                &creator,
            )
            .await
            .unwrap();
        assert_eq!(details.delivery_address, Some(address));

        let fetched = service.get_shipping(order.id).await.unwrap();
        assert_eq!(fetched, details);
        assert_eq!(store.event_count().await, 2);

        let err = service
            .update_shipping(order.id, UpdateShipping::default(), &actor(AccountType::Creator))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
