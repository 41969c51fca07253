use crate::{
    entities::inventory_item::{self, ItemStatus},
    errors::ServiceError,
    services::inventory::{InventoryItemPatch, InventoryQuery, NewInventoryItem},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches against item name and SKU
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub sku: String,
    pub description: String,
    pub category: String,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,
    #[schema(value_type = f64)]
    pub buying_price: Decimal,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub current_stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub buying_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryListQuery),
    responses((status = 200, description = "Inventory items listed")),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<inventory_item::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let status = query
        .status
        .map(|s| s.parse::<ItemStatus>())
        .transpose()
        .map_err(ServiceError::ValidationError)?;

    let (items, total) = state
        .services
        .inventory
        .list(InventoryQuery {
            search: query.search,
            category: query.category,
            status,
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
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item fetched"),
        (status = 404, description = "Item not found")
    ),
    tag = "inventory"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<inventory_item::Model> {
    let model = state.services.inventory.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 200, description = "Item created; status derived from stock levels"),
        (status = 409, description = "SKU already exists")
    ),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryItemRequest>,
) -> ApiResult<inventory_item::Model> {
    payload.validate()?;
    if payload.current_stock < 0 || payload.min_stock < 0 || payload.max_stock < 0 {
        return Err(ServiceError::ValidationError(
            "Stock levels cannot be negative".to_string(),
        ));
    }

    let model = state
        .services
        .inventory
        .create(NewInventoryItem {
            name: payload.name,
            sku: payload.sku,
            description: payload.description,
            category: payload.category,
            current_stock: payload.current_stock,
            min_stock: payload.min_stock,
            max_stock: payload.max_stock,
            buying_price: payload.buying_price,
            unit_price: payload.unit_price,
            image: payload.image,
            location_id: payload.location_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Item updated; stock edits are journalled"),
        (status = 404, description = "Item not found")
    ),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryItemRequest>,
) -> ApiResult<inventory_item::Model> {
    let model = state
        .services
        .inventory
        .update(
            id,
            InventoryItemPatch {
                name: payload.name,
                description: payload.description,
                category: payload.category,
                current_stock: payload.current_stock,
                min_stock: payload.min_stock,
                max_stock: payload.max_stock,
                buying_price: payload.buying_price,
                unit_price: payload.unit_price,
                image: payload.image,
                location_id: payload.location_id,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "Item not found")
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.inventory.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}
