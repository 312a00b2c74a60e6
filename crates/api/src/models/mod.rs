//! Row and view types returned by repositories and serialised by handlers.
//!
//! Rows decode straight from `sqlx` (`FromRow`); JSONB columns decode into the
//! typed maps from `techmart_core`, so a malformed attribute blob surfaces as a
//! decode error instead of leaking into responses.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod dashboard;
pub mod newsletter;
pub mod notification;
pub mod order;
pub mod returns;
pub mod review;
pub mod user;

pub use address::Address;
pub use cart::{Cart, CartLine, CartLineRow, WishlistEntry};
pub use catalog::{
    Brand, BrandDetail, Category, Product, ProductDetail, ProductImage, ProductSummary,
    RatingSummary, Variant, VariantView,
};
pub use coupon::{Coupon, CouponUsage};
pub use dashboard::{Dashboard, LowStockProduct, StatusCount, TopSeller};
pub use newsletter::Subscriber;
pub use notification::Notification;
pub use order::{Order, OrderDetail, OrderItem, OrderListItem};
pub use returns::{ReturnDetail, ReturnItem, ReturnRequest};
pub use review::Review;
pub use user::User;
