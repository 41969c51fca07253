use crate::{
    entities::supplier::{self, SupplierStatus},
    errors::ServiceError,
    services::suppliers::{NewSupplier, SupplierPatch, SupplierQuery},
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
pub struct SupplierListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    pub address: String,
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Result<SupplierStatus, ServiceError> {
    match value {
        "active" => Ok(SupplierStatus::Active),
        "inactive" => Ok(SupplierStatus::Inactive),
        other => Err(ServiceError::ValidationError(format!(
            "unknown supplier status '{}'",
            other
        ))),
    }
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierListQuery>,
) -> ApiResult<PaginatedResponse<supplier::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (items, total) = state
        .services
        .suppliers
        .list(SupplierQuery {
            search: query.search,
            page,
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<supplier::Model> {
    let model = state.services.suppliers.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> ApiResult<supplier::Model> {
    payload.validate()?;
    let model = state
        .services
        .suppliers
        .create(NewSupplier {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            tax_id: payload.tax_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> ApiResult<supplier::Model> {
    let status = payload.status.map(|s| parse_status(&s)).transpose()?;
    let model = state
        .services
        .suppliers
        .update(
            id,
            SupplierPatch {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                tax_id: payload.tax_id,
                status,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.suppliers.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}
