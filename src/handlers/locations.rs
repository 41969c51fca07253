use crate::{
    entities::location::{self, LocationStatus, LocationType},
    errors::ServiceError,
    services::locations::{LocationPatch, LocationQuery, NewLocation},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub capacity: i32,
    /// warehouse, store or distribution_center
    #[serde(rename = "type")]
    pub location_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CapacityChangeRequest {
    /// Signed change applied to the used capacity
    pub change: i32,
}

fn parse_type(value: &str) -> Result<LocationType, ServiceError> {
    value
        .parse::<LocationType>()
        .map_err(ServiceError::ValidationError)
}

fn parse_status(value: &str) -> Result<LocationStatus, ServiceError> {
    match value {
        "active" => Ok(LocationStatus::Active),
        "inactive" => Ok(LocationStatus::Inactive),
        other => Err(ServiceError::ValidationError(format!(
            "unknown location status '{}'",
            other
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(LocationListQuery),
    responses((status = 200, description = "Locations listed")),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationListQuery>,
) -> ApiResult<PaginatedResponse<location::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let location_type = query
        .location_type
        .map(|s| parse_type(&s))
        .transpose()?;

    let (items, total) = state
        .services
        .locations
        .list(LocationQuery {
            search: query.search,
            location_type,
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
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location fetched"),
        (status = 404, description = "Location not found")
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<location::Model> {
    let model = state.services.locations.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 200, description = "Location created active with zero used capacity"),
        (status = 400, description = "Invalid request")
    ),
    tag = "locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> ApiResult<location::Model> {
    payload.validate()?;
    let location_type = parse_type(&payload.location_type)?;

    let model = state
        .services
        .locations
        .create(NewLocation {
            name: payload.name,
            address: payload.address,
            capacity: payload.capacity,
            location_type,
            description: payload.description,
        })
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated"),
        (status = 404, description = "Location not found")
    ),
    tag = "locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> ApiResult<location::Model> {
    let location_type = payload.location_type.map(|s| parse_type(&s)).transpose()?;
    let status = payload.status.map(|s| parse_status(&s)).transpose()?;

    let model = state
        .services
        .locations
        .update(
            id,
            LocationPatch {
                name: payload.name,
                address: payload.address,
                capacity: payload.capacity,
                location_type,
                description: payload.description,
                status,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}/capacity",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = CapacityChangeRequest,
    responses(
        (status = 200, description = "Used capacity adjusted"),
        (status = 404, description = "Location not found"),
        (status = 422, description = "Capacity bound violated; state unchanged")
    ),
    tag = "locations"
)]
pub async fn update_location_capacity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CapacityChangeRequest>,
) -> ApiResult<location::Model> {
    let model = state
        .services
        .locations
        .update_capacity(&*state.db, id, payload.change)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location deleted"),
        (status = 400, description = "Location still holds stock"),
        (status = 404, description = "Location not found")
    ),
    tag = "locations"
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.locations.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}
