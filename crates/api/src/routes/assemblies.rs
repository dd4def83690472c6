//! Assembly and part specification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AssemblyId, OrderId};
use domain::{
    Assembly, AssemblyWithParts, CreateAssembly, PartSpecification, ReorderAssemblies,
    SaveSpecification, SetSpecificationStatus,
};
use record_store::RecordStore;
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller};

#[derive(Serialize)]
pub struct AssemblyResponse<T> {
    pub assembly: T,
}

#[derive(Serialize)]
pub struct AssembliesResponse {
    pub assemblies: Vec<AssemblyWithParts>,
}

#[derive(Serialize)]
pub struct SpecificationResponse {
    pub specification: PartSpecification,
}

#[derive(Serialize)]
pub struct SpecificationsResponse {
    pub specifications: Vec<PartSpecification>,
}

/// GET /api/orders/{orderId}/assemblies
#[tracing::instrument(skip(state, _caller))]
pub async fn list<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<AssembliesResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let assemblies = state.assemblies.list_assemblies_with_parts(order_id).await?;
    Ok(Json(AssembliesResponse { assemblies }))
}

/// POST /api/orders/{orderId}/assemblies
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn create<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<CreateAssembly>,
) -> Result<(StatusCode, Json<AssemblyResponse<AssemblyWithParts>>), ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let assembly = state
        .assemblies
        .create_assembly(order_id, cmd, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(AssemblyResponse { assembly })))
}

/// POST /api/orders/{orderId}/assemblies/build-order
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn reorder<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<ReorderAssemblies>,
) -> Result<Json<AssembliesResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let assemblies = state
        .assemblies
        .reorder_assemblies(order_id, cmd, &caller)
        .await?;
    Ok(Json(AssembliesResponse { assemblies }))
}

/// GET /api/assemblies/{assemblyId}/specifications
#[tracing::instrument(skip(state, _caller))]
pub async fn list_specifications<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<SpecificationsResponse>, ApiError> {
    let assembly_id: AssemblyId = parse_id(&id, "assembly")?;
    let specifications = state.assemblies.list_specifications(assembly_id).await?;
    Ok(Json(SpecificationsResponse { specifications }))
}

/// POST /api/assemblies/{assemblyId}/specifications: create or overwrite.
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn save_specification<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<SaveSpecification>,
) -> Result<Json<SpecificationResponse>, ApiError> {
    let assembly_id: AssemblyId = parse_id(&id, "assembly")?;
    let specification = state
        .assemblies
        .save_specification(assembly_id, cmd, &caller)
        .await?;
    Ok(Json(SpecificationResponse { specification }))
}

/// POST /api/assemblies/{assemblyId}/status: set the completed flag.
#[tracing::instrument(skip(state, caller, cmd))]
pub async fn set_status<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(cmd): ApiJson<SetSpecificationStatus>,
) -> Result<Json<AssemblyResponse<Assembly>>, ApiError> {
    let assembly_id: AssemblyId = parse_id(&id, "assembly")?;
    let assembly = state
        .assemblies
        .set_specification_status(assembly_id, cmd.completed, &caller)
        .await?;
    Ok(Json(AssemblyResponse { assembly }))
}
