use crate::{
    auth::AuthUser,
    entities::supplier_invoice::{self, InvoiceStatus},
    errors::ServiceError,
    services::supplier_invoices::{
        InvoiceStatistics, NewInvoiceLine, NewSupplierInvoice, SupplierInvoicePatch,
        SupplierInvoiceQuery,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches against the invoice reference
    pub search: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<String>,
    pub is_reconciled: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceLinePayload {
    pub item_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub buying_price: Decimal,
    #[schema(value_type = f64)]
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceTaxPayload {
    pub tax_name: String,
    #[schema(value_type = f64)]
    pub rate: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1))]
    pub invoice_ref: String,
    pub supplier_id: Uuid,
    pub invoice_date: DateTime<Utc>,
    pub items: Vec<InvoiceLinePayload>,
    #[schema(value_type = f64)]
    pub vat_rate: Decimal,
    pub additional_taxes: Option<Vec<InvoiceTaxPayload>>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub status: Option<String>,
    pub is_reconciled: Option<bool>,
}

/// List payload: page of invoices plus the aggregate block computed over it.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub invoices: Vec<supplier_invoice::Model>,
    pub statistics: InvoiceStatistics,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/supplier-invoices",
    params(InvoiceListQuery),
    responses((status = 200, description = "Invoices with page statistics")),
    tag = "supplier-invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<InvoiceListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let status = query
        .status
        .map(|s| s.parse::<InvoiceStatus>())
        .transpose()
        .map_err(ServiceError::ValidationError)?;

    let (invoices, total, statistics) = state
        .services
        .supplier_invoices
        .list(SupplierInvoiceQuery {
            search: query.search,
            supplier_id: query.supplier_id,
            status,
            is_reconciled: query.is_reconciled,
            start_date: query.start_date,
            end_date: query.end_date,
            page,
            limit,
        })
        .await?;

    let total_pages = (total + limit - 1) / limit;
    Ok(Json(ApiResponse::success(InvoiceListResponse {
        invoices,
        statistics,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/supplier-invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched"),
        (status = 404, description = "Invoice not found")
    ),
    tag = "supplier-invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<supplier_invoice::Model> {
    let model = state.services.supplier_invoices.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    post,
    path = "/api/v1/supplier-invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice created; stock and buying prices updated"),
        (status = 409, description = "Invoice reference already exists")
    ),
    tag = "supplier-invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> ApiResult<supplier_invoice::Model> {
    payload.validate()?;
    if payload.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Invoice requires at least one item".to_string(),
        ));
    }

    let model = state
        .services
        .supplier_invoices
        .create(
            NewSupplierInvoice {
                invoice_ref: payload.invoice_ref,
                supplier_id: payload.supplier_id,
                invoice_date: payload.invoice_date,
                items: payload
                    .items
                    .into_iter()
                    .map(|line| NewInvoiceLine {
                        item_id: line.item_id,
                        quantity: line.quantity,
                        buying_price: line.buying_price,
                        tax_rate: line.tax_rate,
                    })
                    .collect(),
                vat_rate: payload.vat_rate,
                additional_taxes: payload
                    .additional_taxes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tax| (tax.tax_name, tax.rate))
                    .collect(),
            },
            user.user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

#[utoipa::path(
    put,
    path = "/api/v1/supplier-invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated"),
        (status = 400, description = "Invalid transition or reconciliation"),
        (status = 404, description = "Invoice not found")
    ),
    tag = "supplier-invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> ApiResult<supplier_invoice::Model> {
    let status = payload
        .status
        .map(|s| s.parse::<InvoiceStatus>())
        .transpose()
        .map_err(ServiceError::ValidationError)?;

    let model = state
        .services
        .supplier_invoices
        .update(
            id,
            SupplierInvoicePatch {
                status,
                is_reconciled: payload.is_reconciled,
            },
            user.user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}
