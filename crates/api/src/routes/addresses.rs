//! Address book route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::AddressId;

use crate::db::AddressRepository;
use crate::db::addresses::AddressInput;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Address;
use crate::response::{ApiResponse, ApiResult, Message};
use crate::routes::required;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/addresses", get(list).post(create))
        .route("/api/addresses/{id}", put(update).delete(remove))
        .route("/api/addresses/{id}/default", post(set_default))
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub recipient_name: String,
    pub phone: String,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressRequest {
    fn input(&self) -> Result<AddressInput<'_>, AppError> {
        Ok(AddressInput {
            recipient_name: required("recipient_name", &self.recipient_name)?,
            phone: required("phone", &self.phone)?,
            street: required("street", &self.street)?,
            ward: required("ward", &self.ward)?,
            district: required("district", &self.district)?,
            province: required("province", &self.province)?,
            is_default: self.is_default,
        })
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Vec<Address>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(addresses))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<AddressRequest>,
) -> ApiResult<Address> {
    let address = AddressRepository::new(state.pool())
        .create(user.id, &body.input()?)
        .await?;
    Ok(ApiResponse::created(address))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<AddressId>,
    Json(body): Json<AddressRequest>,
) -> ApiResult<Address> {
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &body.input()?)
        .await?;
    Ok(ApiResponse::ok(address))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<AddressId>,
) -> ApiResult<Message> {
    AddressRepository::new(state.pool()).delete(user.id, id).await?;
    Ok(ApiResponse::ok(Message::new("Address deleted")))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn set_default(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<AddressId>,
) -> ApiResult<Address> {
    let address = AddressRepository::new(state.pool())
        .set_default(user.id, id)
        .await?;
    Ok(ApiResponse::ok(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ward: &str) -> AddressRequest {
        AddressRequest {
            recipient_name: " Nguyen Van A ".to_owned(),
            phone: "0901234567".to_owned(),
            street: "12 Ly Thuong Kiet".to_owned(),
            ward: ward.to_owned(),
            district: "Hoan Kiem".to_owned(),
            province: "Ha Noi".to_owned(),
            is_default: false,
        }
    }

    #[test]
    fn test_input_trims_fields() {
        let req = request("Hang Bai");
        let input = req.input();
        assert!(input.is_ok_and(|i| i.recipient_name == "Nguyen Van A"));
    }

    #[test]
    fn test_input_requires_every_field() {
        let req = request("  ");
        assert!(matches!(req.input(), Err(AppError::Validation(msg)) if msg == "ward is required"));
    }
}
