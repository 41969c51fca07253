use crate::{
    auth::AuthUser,
    entities::stock_movement::{self, MovementStatus, MovementType},
    errors::ServiceError,
    services::stock_movements::{NewStockMovement, StockMovementPatch, StockMovementQuery},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Movement type: in, out or transfer
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub status: Option<String>,
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMovementRequest {
    #[serde(rename = "type")]
    pub movement_type: String,
    pub item_id: Uuid,
    pub quantity: i32,
    pub location_id: Uuid,
    pub to_location_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub manufacturing_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<f64>)]
    pub unit_cost: Option<Decimal>,
    pub minimum_threshold: Option<i32>,
    pub maximum_threshold: Option<i32>,
}

impl CreateMovementRequest {
    fn into_input(self) -> Result<NewStockMovement, ServiceError> {
        let movement_type = self
            .movement_type
            .parse::<MovementType>()
            .map_err(ServiceError::ValidationError)?;
        Ok(NewStockMovement {
            movement_type,
            item_id: self.item_id,
            quantity: self.quantity,
            location_id: self.location_id,
            to_location_id: self.to_location_id,
            reason: self.reason,
            reference: self.reference,
            notes: self.notes,
            batch_number: self.batch_number,
            expiry_date: self.expiry_date,
            manufacturing_date: self.manufacturing_date,
            unit_cost: self.unit_cost,
            minimum_threshold: self.minimum_threshold,
            maximum_threshold: self.maximum_threshold,
        })
    }
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateMovementRequest {
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl UpdateMovementRequest {
    fn into_patch(self) -> Result<StockMovementPatch, ServiceError> {
        let status = self
            .status
            .map(|s| s.parse::<MovementStatus>())
            .transpose()
            .map_err(ServiceError::ValidationError)?;
        Ok(StockMovementPatch {
            reason: self.reason,
            reference: self.reference,
            notes: self.notes,
            status,
            quality_checks: None,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkMovementUpdateEntry {
    pub id: Uuid,
    pub data: UpdateMovementRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementListQuery),
    responses((status = 200, description = "Movements listed, newest first")),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> ApiResult<PaginatedResponse<stock_movement::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let movement_type = query
        .movement_type
        .map(|s| s.parse::<MovementType>())
        .transpose()
        .map_err(ServiceError::ValidationError)?;
    let status = query
        .status
        .map(|s| s.parse::<MovementStatus>())
        .transpose()
        .map_err(ServiceError::ValidationError)?;

    let (items, total) = state
        .services
        .movements
        .list(StockMovementQuery {
            movement_type,
            status,
            item_id: query.item_id,
            location_id: query.location_id,
            to_location_id: query.to_location_id,
            start_date: query.start_date,
            end_date: query.end_date,
            page,
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/movements/{id}",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement fetched"),
        (status = 404, description = "Movement not found")
    ),
    tag = "movements"
)]
pub async fn get_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<stock_movement::Model> {
    let model = state.services.movements.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/movements",
    request_body = CreateMovementRequest,
    responses(
        (status = 200, description = "Movement posted with pending status"),
        (status = 400, description = "Invalid request")
    ),
    tag = "movements"
)]
pub async fn create_movement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateMovementRequest>,
) -> ApiResult<stock_movement::Model> {
    payload.validate()?;
    let input = payload.into_input()?;
    let model = state.services.movements.create(input, user.user_id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/movements/bulk",
    request_body = Vec<CreateMovementRequest>,
    responses((status = 200, description = "Movements posted")),
    tag = "movements"
)]
pub async fn create_movements_bulk(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<Vec<CreateMovementRequest>>,
) -> ApiResult<Vec<stock_movement::Model>> {
    let mut inputs = Vec::with_capacity(payload.len());
    for request in payload {
        request.validate()?;
        inputs.push(request.into_input()?);
    }
    let models = state
        .services
        .movements
        .create_bulk(inputs, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(models)))
}

#[utoipa::path(
    put,
    path = "/api/v1/movements/{id}",
    params(("id" = Uuid, Path, description = "Movement ID")),
    request_body = UpdateMovementRequest,
    responses(
        (status = 200, description = "Movement updated"),
        (status = 404, description = "Movement not found")
    ),
    tag = "movements"
)]
pub async fn update_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMovementRequest>,
) -> ApiResult<stock_movement::Model> {
    let patch = payload.into_patch()?;
    let model = state.services.movements.update(id, patch).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/movements/bulk",
    request_body = Vec<BulkMovementUpdateEntry>,
    responses((status = 200, description = "Movements updated")),
    tag = "movements"
)]
pub async fn update_movements_bulk(
    State(state): State<AppState>,
    Json(payload): Json<Vec<BulkMovementUpdateEntry>>,
) -> ApiResult<Vec<stock_movement::Model>> {
    let mut updates = Vec::with_capacity(payload.len());
    for entry in payload {
        updates.push((entry.id, entry.data.into_patch()?));
    }
    let models = state.services.movements.update_bulk(updates).await?;
    Ok(Json(ApiResponse::success(models)))
}

#[utoipa::path(
    put,
    path = "/api/v1/movements/{id}/void",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement voided"),
        (status = 404, description = "Movement not found")
    ),
    tag = "movements"
)]
pub async fn void_movement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<stock_movement::Model> {
    let model = state
        .services
        .movements
        .void_movement(id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/movements/{id}/cancel",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement cancelled"),
        (status = 404, description = "Movement not found")
    ),
    tag = "movements"
)]
pub async fn cancel_movement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<stock_movement::Model> {
    let model = state
        .services
        .movements
        .cancel_movement(id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/movements/{id}",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement deleted"),
        (status = 404, description = "Movement not found")
    ),
    tag = "movements"
)]
pub async fn delete_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.movements.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/movements",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Movements deleted"),
        (status = 404, description = "No movements matched")
    ),
    tag = "movements"
)]
pub async fn delete_movements_bulk(
    State(state): State<AppState>,
    Json(payload): Json<BulkDeleteRequest>,
) -> ApiResult<serde_json::Value> {
    let deleted = state.services.movements.delete_bulk(payload.ids).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": deleted }),
    )))
}
