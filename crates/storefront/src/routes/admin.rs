//! Admin user management.
//!
//! All handlers require an admin token.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use furnish_core::{UserId, UserRole};

use super::extract::{ApiJson, ApiPath};
use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::state::AppState;

/// Body of `PATCH /api/admin/users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Option<String>,
}

/// GET /api/admin/users
#[instrument(skip(state, admin), fields(admin_id = %admin.0.sub))]
pub async fn users(State(state): State<AppState>, admin: RequireAdmin) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users))
}

/// PATCH /api/admin/users/{id}/role
#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.sub))]
pub async fn set_role(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(body): ApiJson<SetRoleRequest>,
) -> Result<Json<Value>> {
    let role: UserRole = body
        .role
        .as_deref()
        .and_then(|r| r.parse().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid role".to_string()))?;

    UserRepository::new(state.pool())
        .set_role(user_id, role)
        .await
        .map_err(user_not_found)?;

    info!(%user_id, %role, "User role changed");
    Ok(Json(json!({ "message": "Role updated" })))
}

/// DELETE /api/admin/users/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.0.sub))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Value>> {
    UserRepository::new(state.pool())
        .delete(user_id)
        .await
        .map_err(user_not_found)?;

    info!(%user_id, "User deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}

fn user_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
        RepositoryError::Conflict(_) => {
            AppError::Conflict("Cannot delete a user with order history".to_string())
        }
        other => AppError::Database(other),
    }
}
