use crate::{
    entities::stock_movement,
    services::stock_alerts::{StockAlertQuery, StockReportRow},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockAlertListQuery {
    pub item_id: Option<Uuid>,
    /// LOW_STOCK, EXCESS_STOCK or EXPIRING. Accepted for API compatibility;
    /// alert rows carry no stored type to filter on.
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-alerts",
    params(StockAlertListQuery),
    responses((status = 200, description = "Alert source rows, newest first")),
    tag = "stock-alerts"
)]
pub async fn list_stock_alerts(
    State(state): State<AppState>,
    Query(query): Query<StockAlertListQuery>,
) -> ApiResult<Vec<stock_movement::Model>> {
    let alerts = state
        .services
        .stock_alerts
        .get_stock_alerts(StockAlertQuery {
            item_id: query.item_id,
            start_date: query.start_date,
            end_date: query.end_date,
        })
        .await?;
    Ok(Json(ApiResponse::success(alerts)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-alerts/report",
    responses((status = 200, description = "Per-item journal totals with value")),
    tag = "stock-alerts"
)]
pub async fn stock_report(State(state): State<AppState>) -> ApiResult<Vec<StockReportRow>> {
    let report = state.services.stock_alerts.generate_stock_report().await?;
    Ok(Json(ApiResponse::success(report)))
}
