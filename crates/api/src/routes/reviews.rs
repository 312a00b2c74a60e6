//! Product reviews.
//!
//! Only customers who received a product (delivered or returned order) may
//! review it, once.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use techmart_core::{ProductId, ReviewId};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{RatingSummary, Review};
use crate::response::{ApiResponse, ApiResult, Message};
use crate::routes::optional_text;
use crate::state::AppState;

const MAX_COMMENT_LENGTH: usize = 2000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products/{id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/api/reviews/{id}", delete(delete_review))
}

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub rating: RatingSummary,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewRequest {
    fn validate(&self) -> Result<Option<&str>, AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_owned(),
            ));
        }
        let comment = optional_text(self.comment.as_deref());
        if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH) {
            return Err(AppError::Validation(format!(
                "comment must be at most {MAX_COMMENT_LENGTH} characters"
            )));
        }
        Ok(comment)
    }
}

/// Average rating to one decimal place, and the count.
fn summarize(reviews: &[Review]) -> RatingSummary {
    let count = i64::try_from(reviews.len()).unwrap_or(i64::MAX);
    if count == 0 {
        return RatingSummary::default();
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    RatingSummary {
        average: Some((Decimal::from(sum) / Decimal::from(count)).round_dp(1)),
        count,
    }
}

#[instrument(skip(state))]
async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> ApiResult<ProductReviews> {
    let reviews = ReviewRepository::new(state.pool())
        .for_product(product_id)
        .await?;
    Ok(ApiResponse::ok(ProductReviews {
        rating: summarize(&reviews),
        reviews,
    }))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn create_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<ProductId>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<Review> {
    let comment = body.validate()?;

    ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    let reviews = ReviewRepository::new(state.pool());
    if !reviews.has_purchased(user.id, product_id).await? {
        return Err(AppError::BadRequest(
            "you can only review products you have received".to_owned(),
        ));
    }

    let review = reviews
        .create(user.id, product_id, body.rating, comment)
        .await?;
    tracing::info!(review_id = %review.id, "Review created");
    Ok(ApiResponse::created(review))
}

/// Delete one of the user's own reviews.
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<ReviewId>,
) -> ApiResult<Message> {
    ReviewRepository::new(state.pool())
        .delete(id, Some(user.id))
        .await?;
    Ok(ApiResponse::ok(Message::new("Review deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use techmart_core::UserId;

    use super::*;

    fn review(rating: i16) -> Review {
        Review {
            id: ReviewId::new(1),
            product_id: ProductId::new(1),
            product_name: "Galaxy S24".to_owned(),
            user_id: UserId::new(1),
            user_name: "Lan".to_owned(),
            rating,
            comment: None,
            is_visible: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_rounds_to_one_decimal() {
        let summary = summarize(&[review(5), review(4), review(4)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(Decimal::new(43, 1)));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.average.is_none());
    }

    #[test]
    fn test_review_validation() {
        let ok = ReviewRequest {
            rating: 5,
            comment: Some("  great  ".to_owned()),
        };
        assert_eq!(ok.validate().unwrap(), Some("great"));

        let zero = ReviewRequest {
            rating: 0,
            comment: None,
        };
        assert!(zero.validate().is_err());

        let long = ReviewRequest {
            rating: 3,
            comment: Some("x".repeat(MAX_COMMENT_LENGTH + 1)),
        };
        assert!(long.validate().is_err());
    }
}
