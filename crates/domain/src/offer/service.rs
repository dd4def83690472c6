//! Offer service: submission, arbitration and read paths.

use chrono::Utc;
use common::{OfferId, OrderId};
use record_store::{RecordQuery, RecordStore, RecordStoreExt, Stored, WriteBatch};
use serde::Serialize;
use serde_json::json;

use crate::error::{DomainError, ErrorKind};
use crate::events::{DomainEvent, MarketEvent};
use crate::order::{Order, load_order};
use crate::value_objects::Actor;

use super::{Offer, OfferTerms, SubmitOffer};

/// Attempts made by `submit_offer` when the order changes underneath it.
const SUBMIT_ATTEMPTS: u32 = 3;

/// Result of a successful acceptance.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub offer: Offer,
    pub order: Order,
}

/// Service for submitting and arbitrating offers.
pub struct OfferService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> OfferService<S> {
    /// Creates a new offer service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load_offer(&self, offer_id: OfferId) -> Result<Stored<Offer>, DomainError> {
        self.store
            .load::<Offer>(offer_id.as_uuid())
            .await?
            .ok_or_else(|| DomainError::not_found("offer", offer_id))
    }

    /// Places a bid on an unclaimed order.
    ///
    /// Concurrent bids on the same order are not a business conflict, so a
    /// stale order version is reloaded and retried a bounded number of times.
    #[tracing::instrument(skip(self, cmd, actor), fields(actor = %actor.user_id()))]
    pub async fn submit_offer(
        &self,
        order_id: OrderId,
        cmd: SubmitOffer,
        actor: &Actor,
    ) -> Result<Offer, DomainError> {
        if !actor.is_manufacturer() {
            return Err(DomainError::Forbidden {
                action: "submit offers",
            });
        }
        let terms = OfferTerms::try_from(cmd)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let Stored {
                entity: mut order,
                version,
            } = load_order(&self.store, order_id).await?;

            let offer = Offer::new(order_id, actor.contact.clone(), terms, now);
            order.record_offer(offer.id, now)?;

            let event = MarketEvent::OfferSubmitted {
                order: (&order).into(),
                offer: (&offer).into(),
            };
            let batch = WriteBatch::new()
                .insert(&offer)?
                .update(&order, version)?
                .event(event.to_outbox()?);

            match self.store.commit(batch).await {
                Ok(()) => {
                    metrics::counter!("offers_submitted_total").increment(1);
                    tracing::info!(offer_id = %offer.id, attempt, "offer submitted");
                    return Ok(offer);
                }
                Err(e) if e.is_conflict() && attempt < SUBMIT_ATTEMPTS => {
                    tracing::debug!(attempt, "order changed during offer submission, retrying");
                }
                Err(e) => {
                    return Err(DomainError::from_commit(e, "order", order_id, "submit offer"));
                }
            }
        }
    }

    /// Accepts an offer, claiming its order for the offering manufacturer.
    ///
    /// The offer and order are written in one batch conditional on the
    /// versions read here, so of two racing acceptances on the same order
    /// exactly one commits.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn accept_offer(
        &self,
        offer_id: OfferId,
        actor: &Actor,
    ) -> Result<AcceptOutcome, DomainError> {
        let result = self.try_accept(offer_id, actor).await;
        if let Err(err) = &result {
            if err.kind() == ErrorKind::Conflict {
                metrics::counter!("offer_accept_conflicts_total").increment(1);
                tracing::warn!(error = %err, "offer acceptance rejected");
            }
        }
        result
    }

    async fn try_accept(
        &self,
        offer_id: OfferId,
        actor: &Actor,
    ) -> Result<AcceptOutcome, DomainError> {
        let Stored {
            entity: mut offer,
            version: offer_version,
        } = self.load_offer(offer_id).await?;
        let Stored {
            entity: mut order,
            version: order_version,
        } = load_order(&self.store, offer.order_id).await?;

        if !actor.acts_for(order.creator.user_id) {
            return Err(DomainError::Forbidden {
                action: "accept offers on this order",
            });
        }

        let now = Utc::now();
        offer.accept(now)?;
        order.assign_manufacturer(&offer, now)?;

        let event = MarketEvent::OfferAccepted {
            order: (&order).into(),
            offer: (&offer).into(),
        };
        let batch = WriteBatch::new()
            .update(&offer, offer_version)?
            .update(&order, order_version)?
            .event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "order", order.id, "accept offer"))?;

        metrics::counter!("offers_accepted_total").increment(1);
        tracing::info!(order_id = %order.id, "offer accepted");
        Ok(AcceptOutcome { offer, order })
    }

    /// Declines an offer. Declining twice is a no-op.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id()))]
    pub async fn decline_offer(
        &self,
        offer_id: OfferId,
        actor: &Actor,
    ) -> Result<Offer, DomainError> {
        let Stored {
            entity: mut offer,
            version,
        } = self.load_offer(offer_id).await?;
        let order = load_order(&self.store, offer.order_id).await?.into_inner();

        if !actor.acts_for(order.creator.user_id) {
            return Err(DomainError::Forbidden {
                action: "decline offers on this order",
            });
        }
        if !offer.decline(Utc::now())? {
            return Ok(offer);
        }

        let event = MarketEvent::OfferDeclined {
            order: (&order).into(),
            offer: (&offer).into(),
        };
        let batch = WriteBatch::new()
            .update(&offer, version)?
            .event(event.to_outbox()?);
        self.store
            .commit(batch)
            .await
            .map_err(|e| DomainError::from_commit(e, "offer", offer_id, "decline offer"))?;

        tracing::info!("offer declined");
        Ok(offer)
    }

    /// Loads an offer by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_offer(&self, offer_id: OfferId) -> Result<Offer, DomainError> {
        Ok(self.load_offer(offer_id).await?.into_inner())
    }

    /// Every offer on an order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_offers(&self, order_id: OrderId) -> Result<Vec<Offer>, DomainError> {
        load_order(&self.store, order_id).await?;
        self.offers_of(order_id).await
    }

    /// Offers still awaiting a decision, oldest first.
    ///
    /// Once any offer on the order is accepted the rest are closed, so the
    /// list is empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_open_offers(&self, order_id: OrderId) -> Result<Vec<Offer>, DomainError> {
        let order = load_order(&self.store, order_id).await?.into_inner();
        if order.selected_offer.is_some() {
            return Ok(Vec::new());
        }

        let offers = self.offers_of(order_id).await?;
        if offers.iter().any(|offer| offer.is_accepted) {
            return Ok(Vec::new());
        }
        Ok(offers.into_iter().filter(Offer::is_open).collect())
    }

    async fn offers_of(&self, order_id: OrderId) -> Result<Vec<Offer>, DomainError> {
        let query = RecordQuery::of::<Offer>().filter("order_id", json!(order_id));
        let mut offers: Vec<Offer> = self
            .store
            .find::<Offer>(query)
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect();
        offers.sort_by_key(|offer| offer.created_at);
        Ok(offers)
    }
}
