use crate::{auth::AuthUser, ApiResponse, ApiResult};
use axum::{response::Json, Extension};

/// Identity of the authenticated caller, straight from the validated token.
pub async fn me(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(Json(ApiResponse::success(user)))
}
