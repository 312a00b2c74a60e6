//! Dashboard route handler.

use axum::{Router, extract::State, routing::get};
use tracing::instrument;

use crate::db::DashboardRepository;
use crate::middleware::RequireAdmin;
use crate::models::Dashboard;
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/dashboard", get(dashboard))
}

/// Revenue, order counts, stock alerts and recent activity.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> ApiResult<Dashboard> {
    let dashboard = DashboardRepository::new(state.pool()).load().await?;
    Ok(ApiResponse::ok(dashboard))
}
