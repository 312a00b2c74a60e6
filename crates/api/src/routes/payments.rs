//! MoMo instant payment notification (IPN) webhook.
//!
//! MoMo retries a notification until it gets a 2xx, so once the payload
//! parses the handler always answers `204 No Content`. Forged or mismatched
//! notifications are logged and dropped; a replay of a processed one changes
//! nothing because only unpaid orders flip to paid.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use tracing::instrument;

use techmart_core::to_minor_units;

use crate::db::OrderRepository;
use crate::error::AppError;
use crate::services::momo::IpnPayload;
use crate::state::AppState;

/// MoMo's code for a successful payment.
const RESULT_SUCCESS: i64 = 0;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/payments/momo/ipn", post(momo_ipn))
}

#[instrument(
    skip(state, ipn),
    fields(momo_order_id = %ipn.order_id, result_code = ipn.result_code, trans_id = ipn.trans_id)
)]
async fn momo_ipn(
    State(state): State<AppState>,
    Json(ipn): Json<IpnPayload>,
) -> Result<StatusCode, AppError> {
    let Some(momo) = state.momo() else {
        tracing::warn!("MoMo IPN received but MoMo is not configured");
        return Ok(StatusCode::NO_CONTENT);
    };

    let order_id = match momo.verify_ipn(&ipn) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected MoMo IPN");
            return Ok(StatusCode::NO_CONTENT);
        }
    };

    if ipn.result_code != RESULT_SUCCESS {
        tracing::info!(order_id = %order_id, message = %ipn.message, "MoMo payment not completed");
        return Ok(StatusCode::NO_CONTENT);
    }

    let orders = OrderRepository::new(state.pool());
    let Some(order) = orders.get(order_id, None).await? else {
        tracing::warn!(order_id = %order_id, "MoMo IPN for unknown order");
        return Ok(StatusCode::NO_CONTENT);
    };
    if to_minor_units(order.total) != Some(ipn.amount) {
        tracing::warn!(
            order_id = %order_id,
            amount = ipn.amount,
            total = %order.total,
            "MoMo IPN amount does not match order total"
        );
        return Ok(StatusCode::NO_CONTENT);
    }

    if orders.mark_paid(order_id, &ipn.trans_id.to_string()).await? {
        tracing::info!(order_id = %order_id, "Order paid via MoMo");
    } else {
        tracing::info!(order_id = %order_id, "MoMo IPN ignored, order not awaiting payment");
    }
    Ok(StatusCode::NO_CONTENT)
}
