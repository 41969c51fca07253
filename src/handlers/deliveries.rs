use crate::{
    entities::delivery::{
        self, AdditionalTax, AdditionalTaxes, DeliveryAddress, DeliveryStatus, TrackedLocation,
    },
    errors::ServiceError,
    services::deliveries::{
        DeliveryPatch, DeliveryQuery, NewDelivery, NewDeliveryItem, ProofOfDeliveryInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    /// Delivery status, or `all` for no filter
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressPayload {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressPayload> for DeliveryAddress {
    fn from(value: AddressPayload) -> Self {
        DeliveryAddress {
            address: value.address,
            city: value.city,
            state: value.state,
            postal_code: value.postal_code,
            country: value.country,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryItemPayload {
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[schema(value_type = f64)]
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdditionalTaxPayload {
    pub tax_name: String,
    #[schema(value_type = f64)]
    pub rate: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryRequest {
    #[validate(length(min = 1))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1))]
    pub customer_phone: String,
    pub delivery_address: AddressPayload,
    pub items: Vec<DeliveryItemPayload>,
    pub delivery_company_id: Uuid,
    #[schema(value_type = f64)]
    pub vat_rate: Decimal,
    pub additional_taxes: Option<Vec<AdditionalTaxPayload>>,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
}

impl CreateDeliveryRequest {
    fn into_new_delivery(self) -> Result<NewDelivery, ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Delivery requires at least one item".to_string(),
            ));
        }
        for item in &self.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid quantity for product {}",
                    item.product_id
                )));
            }
            if item.unit_price < Decimal::ZERO || item.tax_rate < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Negative price or tax rate for product {}",
                    item.product_id
                )));
            }
        }
        if self.vat_rate < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "VAT rate cannot be negative".to_string(),
            ));
        }

        Ok(NewDelivery {
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            delivery_address: self.delivery_address.into(),
            items: self
                .items
                .into_iter()
                .map(|item| NewDeliveryItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    tax_rate: item.tax_rate,
                })
                .collect(),
            delivery_company_id: self.delivery_company_id,
            vat_rate: self.vat_rate,
            additional_taxes: self.additional_taxes.map(|taxes| {
                AdditionalTaxes(
                    taxes
                        .into_iter()
                        .map(|tax| AdditionalTax {
                            tax_name: tax.tax_name,
                            rate: tax.rate,
                        })
                        .collect(),
                )
            }),
            notes: self.notes,
            preferred_delivery_date: self.preferred_delivery_date,
        })
    }
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateDeliveryRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<AddressPayload>,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl UpdateDeliveryRequest {
    fn into_patch(self) -> Result<DeliveryPatch, ServiceError> {
        let status = self
            .status
            .map(|s| parse_status(&s))
            .transpose()?;
        Ok(DeliveryPatch {
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            delivery_address: self.delivery_address.map(Into::into),
            notes: self.notes,
            preferred_delivery_date: self.preferred_delivery_date,
            status,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackedLocationPayload {
    /// [latitude, longitude]
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
    pub address: String,
}

impl From<TrackedLocationPayload> for TrackedLocation {
    fn from(value: TrackedLocationPayload) -> Self {
        TrackedLocation {
            coordinates: value.coordinates,
            address: value.address,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
    pub location: Option<TrackedLocationPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProofOfDeliveryRequest {
    #[validate(length(min = 1))]
    pub received_by: String,
    pub signature: Option<String>,
    pub photos: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkUpdateEntry {
    pub id: Uuid,
    pub data: UpdateDeliveryRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OptimizeRouteRequest {
    pub delivery_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DateRangeQuery {
    /// Defaults to the trailing 30 days.
    fn resolve(self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end_date.unwrap_or_else(Utc::now);
        let start = self.start_date.unwrap_or(end - Duration::days(30));
        (start, end)
    }
}

fn parse_status(value: &str) -> Result<DeliveryStatus, ServiceError> {
    value
        .parse::<DeliveryStatus>()
        .map_err(ServiceError::ValidationError)
}

/// `all` (or absence) means no status filter.
fn parse_status_filter(value: Option<&str>) -> Result<Option<DeliveryStatus>, ServiceError> {
    match value {
        None | Some("all") => Ok(None),
        Some(other) => parse_status(other).map(Some),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries listed"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(query): Query<DeliveryListQuery>,
) -> ApiResult<PaginatedResponse<delivery::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let status = parse_status_filter(query.status.as_deref())?;

    let (items, total) = state
        .services
        .deliveries
        .list(DeliveryQuery {
            search: query.search,
            status,
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
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery fetched"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<delivery::Model> {
    let model = state.services.deliveries.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery created"),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Delivery company not found")
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> ApiResult<delivery::Model> {
    payload.validate()?;
    let input = payload.into_new_delivery()?;
    let model = state.services.deliveries.create(input).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated"),
        (status = 400, description = "Invalid transition"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> ApiResult<delivery::Model> {
    let patch = payload.into_patch()?;
    let model = state.services.deliveries.update(id, patch).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}/status",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated and history appended"),
        (status = 400, description = "Invalid transition"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<delivery::Model> {
    let status = parse_status(&payload.status)?;
    let model = state
        .services
        .deliveries
        .update_status(id, status, payload.notes, payload.location.map(Into::into))
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}/void",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery voided"),
        (status = 400, description = "Already voided or completed"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn void_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<delivery::Model> {
    let model = state.services.deliveries.void_delivery(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}/proof-of-delivery",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = ProofOfDeliveryRequest,
    responses(
        (status = 200, description = "Proof recorded"),
        (status = 400, description = "Delivery is not in delivered status"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn add_proof_of_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProofOfDeliveryRequest>,
) -> ApiResult<delivery::Model> {
    payload.validate()?;
    let model = state
        .services
        .deliveries
        .add_proof_of_delivery(
            id,
            ProofOfDeliveryInput {
                received_by: payload.received_by,
                signature: payload.signature,
                photos: payload.photos,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}/location",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = TrackedLocationPayload,
    responses(
        (status = 200, description = "Courier position recorded"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn update_delivery_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TrackedLocationPayload>,
) -> ApiResult<delivery::Model> {
    let model = state
        .services
        .deliveries
        .update_location(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries/bulk",
    request_body = Vec<CreateDeliveryRequest>,
    responses(
        (status = 200, description = "Batch created"),
        (status = 409, description = "Duplicate invoice number; batch aborted")
    ),
    tag = "deliveries"
)]
pub async fn create_deliveries_bulk(
    State(state): State<AppState>,
    Json(payload): Json<Vec<CreateDeliveryRequest>>,
) -> ApiResult<Vec<delivery::Model>> {
    let mut inputs = Vec::with_capacity(payload.len());
    for request in payload {
        request.validate()?;
        inputs.push(request.into_new_delivery()?);
    }
    let models = state.services.deliveries.create_bulk(inputs).await?;
    Ok(Json(ApiResponse::success(models)))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/bulk",
    request_body = Vec<BulkUpdateEntry>,
    responses(
        (status = 200, description = "Batch updated"),
        (status = 400, description = "Invalid transition; batch aborted")
    ),
    tag = "deliveries"
)]
pub async fn update_deliveries_bulk(
    State(state): State<AppState>,
    Json(payload): Json<Vec<BulkUpdateEntry>>,
) -> ApiResult<Vec<delivery::Model>> {
    let mut updates = Vec::with_capacity(payload.len());
    for entry in payload {
        updates.push((entry.id, entry.data.into_patch()?));
    }
    let models = state.services.deliveries.update_bulk(updates).await?;
    Ok(Json(ApiResponse::success(models)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery deleted"),
        (status = 404, description = "Delivery not found")
    ),
    tag = "deliveries"
)]
pub async fn delete_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.deliveries.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries/analytics/performance",
    params(DateRangeQuery),
    responses((status = 200, description = "Performance metrics")),
    tag = "deliveries"
)]
pub async fn performance_metrics(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult<crate::services::delivery_analytics::PerformanceMetrics> {
    let (start, end) = query.resolve();
    let metrics = state
        .services
        .delivery_analytics
        .performance_metrics(start, end)
        .await?;
    Ok(Json(ApiResponse::success(metrics)))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries/analytics/trends",
    params(DateRangeQuery),
    responses((status = 200, description = "Daily and hourly delivery trends")),
    tag = "deliveries"
)]
pub async fn delivery_trends(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult<crate::services::delivery_analytics::DeliveryTrends> {
    let (start, end) = query.resolve();
    let trends = state
        .services
        .delivery_analytics
        .trends(start, end)
        .await?;
    Ok(Json(ApiResponse::success(trends)))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries/route/optimize",
    request_body = OptimizeRouteRequest,
    responses((status = 200, description = "Deliveries in visiting order")),
    tag = "deliveries"
)]
pub async fn optimize_route(
    State(state): State<AppState>,
    Json(payload): Json<OptimizeRouteRequest>,
) -> ApiResult<Vec<delivery::Model>> {
    let ordered = state
        .services
        .route_optimization
        .optimize_route(payload.delivery_ids)
        .await?;
    Ok(Json(ApiResponse::success(ordered)))
}
