//! User management route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list))
        .route("/api/admin/users/{id}", put(update))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Admins cannot lock themselves out.
fn check_self_update(
    admin_id: UserId,
    target: UserId,
    body: &UpdateUserRequest,
) -> Result<(), AppError> {
    if admin_id != target {
        return Ok(());
    }
    if body.role.is_some_and(|r| r != UserRole::Admin) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_owned(),
        ));
    }
    if body.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "You cannot disable your own account".to_owned(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<UserQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<User>> {
    let (items, total) = UserRepository::new(state.pool())
        .list(query.q.as_deref(), page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    check_self_update(admin.id, id, &body)?;
    let user = UserRepository::new(state.pool())
        .update_access(id, body.role, body.is_active)
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, is_active = user.is_active, "User access updated");
    Ok(ApiResponse::ok(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cannot_demote_or_disable_self() {
        let me = UserId::new(1);
        let demote = UpdateUserRequest {
            role: Some(UserRole::Customer),
            is_active: None,
        };
        let disable = UpdateUserRequest {
            role: None,
            is_active: Some(false),
        };
        assert!(check_self_update(me, me, &demote).is_err());
        assert!(check_self_update(me, me, &disable).is_err());
        assert!(check_self_update(me, UserId::new(2), &demote).is_ok());

        let noop = UpdateUserRequest {
            role: Some(UserRole::Admin),
            is_active: Some(true),
        };
        assert!(check_self_update(me, me, &noop).is_ok());
    }
}
