//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{AccountType, AdvanceStatus, CreateOrderDraft, Order, ShippingDetails, UpdateShipping};
use record_store::RecordStore;
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller};

#[derive(Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Serialize)]
pub struct ShippingResponse {
    pub shipping: ShippingDetails,
}

/// POST /api/orders/drafts: draft a new order.
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn create_draft<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    ApiJson(cmd): ApiJson<CreateOrderDraft>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.orders.create_draft(cmd, &caller).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse { order })))
}

/// GET /api/orders: orders the caller created or manufactures.
#[tracing::instrument(skip(state, caller))]
pub async fn list_mine<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = match caller.account_type {
        AccountType::Manufacturer => state.orders.list_for_manufacturer(caller.user_id()).await?,
        AccountType::Creator | AccountType::Admin => {
            state.orders.list_for_creator(caller.user_id()).await?
        }
    };
    Ok(Json(OrdersResponse { orders }))
}

/// GET /api/orders/unclaimed: orders still open for offers.
#[tracing::instrument(skip(state, _caller))]
pub async fn list_unclaimed<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.orders.list_unclaimed().await?;
    Ok(Json(OrdersResponse { orders }))
}

/// GET /api/orders/{orderId}
#[tracing::instrument(skip(state, _caller))]
pub async fn get<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(OrderResponse { order }))
}

/// POST /api/orders/{orderId}/archive
#[tracing::instrument(skip(state, caller))]
pub async fn archive<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.archive_order(order_id, &caller).await?;
    Ok(Json(OrderResponse { order }))
}

/// POST /api/orders/{orderId}/status: advance to the next stage.
///
/// The body is optional; when present it may carry shipping info recorded on
/// entering "Shipped".
#[tracing::instrument(skip(state, caller, body))]
pub async fn advance_status<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let cmd = if body.iter().all(u8::is_ascii_whitespace) {
        AdvanceStatus::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let order = state.orders.advance_status(order_id, cmd, &caller).await?;
    Ok(Json(OrderResponse { order }))
}

/// GET /api/orders/{orderId}/shipping
#[tracing::instrument(skip(state, _caller))]
pub async fn get_shipping<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ShippingResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let shipping = state.orders.get_shipping(order_id).await?;
    Ok(Json(ShippingResponse { shipping }))
}

/// POST /api/orders/{orderId}/shipping
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn update_shipping<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<UpdateShipping>,
) -> Result<Json<ShippingResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let shipping = state.orders.update_shipping(order_id, cmd, &caller).await?;
    Ok(Json(ShippingResponse { shipping }))
}
