use crate::{
    entities::delivery_company::{self, CompanyStatus},
    errors::ServiceError,
    services::delivery_companies::{
        DeliveryCompanyPatch, DeliveryCompanyQuery, NewDeliveryCompany,
    },
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
pub struct CompanyListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub rating: Option<f64>,
}

fn parse_status(value: &str) -> Result<CompanyStatus, ServiceError> {
    match value {
        "active" => Ok(CompanyStatus::Active),
        "inactive" => Ok(CompanyStatus::Inactive),
        other => Err(ServiceError::ValidationError(format!(
            "unknown company status '{}'",
            other
        ))),
    }
}

pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> ApiResult<PaginatedResponse<delivery_company::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (items, total) = state
        .services
        .delivery_companies
        .list(DeliveryCompanyQuery {
            search: query.search,
            page,
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<delivery_company::Model> {
    let model = state.services.delivery_companies.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn create_company(
    State(state): State<AppState>,
    Json(payload): Json<CreateCompanyRequest>,
) -> ApiResult<delivery_company::Model> {
    payload.validate()?;
    let model = state
        .services
        .delivery_companies
        .create(NewDeliveryCompany {
            name: payload.name,
            code: payload.code,
            phone: payload.phone,
            email: payload.email,
            address: payload.address,
        })
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> ApiResult<delivery_company::Model> {
    if let Some(rating) = payload.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(ServiceError::ValidationError(
                "Rating must be between 0 and 5".to_string(),
            ));
        }
    }
    let status = payload.status.map(|s| parse_status(&s)).transpose()?;

    let model = state
        .services
        .delivery_companies
        .update(
            id,
            DeliveryCompanyPatch {
                name: payload.name,
                phone: payload.phone,
                email: payload.email,
                address: payload.address,
                status,
                rating: payload.rating,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.delivery_companies.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}
