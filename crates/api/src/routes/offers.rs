//! Offer submission and arbitration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OfferId, OrderId};
use domain::{Offer, Order, SubmitOffer};
use record_store::RecordStore;
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller};

#[derive(Serialize)]
pub struct OfferResponse {
    pub offer: Offer,
}

#[derive(Serialize)]
pub struct OffersResponse {
    pub offers: Vec<Offer>,
}

#[derive(Serialize)]
pub struct AcceptResponse {
    pub offer: Offer,
    pub order: Order,
}

/// GET /api/orders/{orderId}/offers: offers still open for decision.
#[tracing::instrument(skip(state, _caller))]
pub async fn list_open<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OffersResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let offers = state.offers.list_open_offers(order_id).await?;
    Ok(Json(OffersResponse { offers }))
}

/// POST /api/orders/{orderId}/offers: bid on an order.
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn submit<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<SubmitOffer>,
) -> Result<(StatusCode, Json<OfferResponse>), ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let offer = state.offers.submit_offer(order_id, cmd, &caller).await?;
    Ok((StatusCode::CREATED, Json(OfferResponse { offer })))
}

/// POST /api/offers/{offerId}/accept
#[tracing::instrument(skip(state, caller))]
pub async fn accept<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let offer_id: OfferId = parse_id(&id, "offer")?;
    let outcome = state.offers.accept_offer(offer_id, &caller).await?;
    Ok(Json(AcceptResponse {
        offer: outcome.offer,
        order: outcome.order,
    }))
}

/// POST /api/offers/{offerId}/decline
#[tracing::instrument(skip(state, caller))]
pub async fn decline<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<OfferResponse>, ApiError> {
    let offer_id: OfferId = parse_id(&id, "offer")?;
    let offer = state.offers.decline_offer(offer_id, &caller).await?;
    Ok(Json(OfferResponse { offer }))
}
