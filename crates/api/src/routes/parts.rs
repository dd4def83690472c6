//! CAD upload and split endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use cad_client::CadUpload;
use common::OrderId;
use domain::{DomainError, SplitResult, normalize_split_response};
use record_store::RecordStore;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Caller;

/// POST /api/orders/{orderId}/parts/split: multipart field `file`.
///
/// Only participants of the order may split files for it. The CAD answer is
/// normalized so every part carries name, hierarchy and storage path.
#[tracing::instrument(skip(state, caller, multipart))]
pub async fn split<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SplitResult>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order(order_id).await?;
    let user = caller.user_id();
    if !caller.is_admin() && !order.is_owned_by(user) && !order.is_manufactured_by(user) {
        return Err(DomainError::Forbidden {
            action: "split files for this order",
        }
        .into());
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some(CadUpload {
            user_id: user.to_string(),
            order_id: order_id.to_string(),
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    let upload =
        upload.ok_or_else(|| ApiError::BadRequest("multipart field `file` is required".into()))?;
    if upload.bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }

    let body = state.cad.split(upload).await?;
    let result = normalize_split_response(body)?;
    tracing::info!(parts = result.parts.len(), "CAD file split");
    Ok(Json(result))
}
