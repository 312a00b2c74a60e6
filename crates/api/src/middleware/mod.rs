//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (record into the span, echo in the response)
//! 4. CORS
//! 5. Security headers
//! 6. Rate limiting (governor, per route group)
//!
//! Authentication is not a layer: handlers take the [`AuthUser`] or
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AuthUser, RequireAdmin};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
