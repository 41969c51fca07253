use crate::{
    entities::user::{self, UserRole, UserStatus},
    errors::ServiceError,
    services::users::{NewUser, UserPatch, UserQuery},
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
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    /// admin or user
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub permissions: Option<Vec<String>>,
}

fn parse_role(value: &str) -> Result<UserRole, ServiceError> {
    value
        .parse::<UserRole>()
        .map_err(ServiceError::ValidationError)
}

fn parse_status(value: &str) -> Result<UserStatus, ServiceError> {
    match value {
        "active" => Ok(UserStatus::Active),
        "inactive" => Ok(UserStatus::Inactive),
        other => Err(ServiceError::ValidationError(format!(
            "unknown user status '{}'",
            other
        ))),
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<user::Model>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (items, total) = state
        .services
        .users
        .list(UserQuery {
            search: query.search,
            page,
            limit,
        })
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<user::Model> {
    let model = state.services.users.get(id).await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<user::Model> {
    payload.validate()?;
    let role = payload
        .role
        .as_deref()
        .map(parse_role)
        .transpose()?
        .unwrap_or(UserRole::User);

    let model = state
        .services
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role,
            permissions: payload.permissions,
        })
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<user::Model> {
    let role = payload.role.as_deref().map(parse_role).transpose()?;
    let status = payload.status.map(|s| parse_status(&s)).transpose()?;

    let model = state
        .services
        .users
        .update(
            id,
            UserPatch {
                name: payload.name,
                password: payload.password,
                role,
                status,
                permissions: payload.permissions,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.users.delete(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}
