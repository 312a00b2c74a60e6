//! JSON envelope and pagination helpers.
//!
//! Every response body has the shape `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}` (see [`crate::error::AppError`]).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest page a client may request.
pub const MAX_PER_PAGE: u32 = 60;
const DEFAULT_PER_PAGE: u32 = 20;

/// Successful response wrapped in the envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    data: &'a T,
}

impl<T> ApiResponse<T> {
    /// `200 OK`.
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// `201 Created`.
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: &self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Result type for JSON handlers.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// A plain confirmation message.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(items: Vec<T>, params: PageParams, total: i64) -> Self {
        let per_page = i64::from(params.per_page());
        Self {
            items,
            page: params.page(),
            per_page: params.per_page(),
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults_and_clamps() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 20);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);

        let params = PageParams {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn test_paginated_total_pages() {
        let params = PageParams {
            page: Some(1),
            per_page: Some(10),
        };
        assert_eq!(Paginated::new(vec![1], params, 21).total_pages, 3);
        assert_eq!(Paginated::<i32>::new(vec![], params, 0).total_pages, 0);
    }

    #[test]
    fn test_envelope_shape() {
        let body = Envelope {
            success: true,
            data: &Message::new("ok"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": {"message": "ok"}}));
    }
}
