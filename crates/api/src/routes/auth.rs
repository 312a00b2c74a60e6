//! Account route handlers: registration, sign-in, profile and password reset.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::AuthUser;
use crate::models::User;
use crate::response::{ApiResponse, ApiResult, Message};
use crate::routes::{optional_text, required};
use crate::services::auth::{
    AuthError, AuthService, AuthSession, RESET_TOKEN_TTL_MINUTES, Registration,
};
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/google", post(google_login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/me", get(me).put(update_me))
        .route("/api/auth/change-password", post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
}

fn check_name(name: &str) -> Result<&str, AppError> {
    let name = required("name", name)?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Create a customer account and sign it in.
#[instrument(skip(state, body), fields(email = %body.email))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<AuthSession> {
    let name = check_name(&body.name)?;
    let session = AuthService::new(state.pool(), state.jwt())
        .register(&Registration {
            name,
            email: &body.email,
            password: &body.password,
            phone: optional_text(body.phone.as_deref()),
        })
        .await?;
    add_breadcrumb("auth", "Registered", None);
    Ok(ApiResponse::created(session))
}

/// Sign in with email and password.
#[instrument(skip(state, body), fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<AuthSession> {
    let session = AuthService::new(state.pool(), state.jwt())
        .login(&body.email, &body.password)
        .await?;
    add_breadcrumb("auth", "Signed in", None);
    Ok(ApiResponse::ok(session))
}

/// Sign in with a Google ID token.
#[instrument(skip(state, body))]
async fn google_login(
    State(state): State<AppState>,
    Json(body): Json<GoogleLoginRequest>,
) -> ApiResult<AuthSession> {
    let verifier = state.google().ok_or(AuthError::GoogleDisabled)?;
    let identity = verifier.verify(body.id_token.trim()).await?;
    let session = AuthService::new(state.pool(), state.jwt())
        .login_with_google(&identity)
        .await?;
    add_breadcrumb("auth", "Signed in with Google", None);
    Ok(ApiResponse::ok(session))
}

/// Email a reset link. Answers the same whether or not the account exists.
#[instrument(skip(state, body))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<Message> {
    let ticket = AuthService::new(state.pool(), state.jwt())
        .forgot_password(&body.email)
        .await?;

    if let Some(ticket) = ticket {
        let reset_url = reset_link(&state.config().frontend_url, &ticket.token)?;
        match state.email() {
            Some(email) => {
                if let Err(e) = email
                    .send_password_reset(
                        ticket.user.email.as_str(),
                        &ticket.user.name,
                        &reset_url,
                        RESET_TOKEN_TTL_MINUTES,
                    )
                    .await
                {
                    tracing::error!(user_id = %ticket.user.id, error = %e, "Failed to send reset email");
                }
            }
            None => {
                tracing::warn!(user_id = %ticket.user.id, "Email disabled, reset link not sent");
            }
        }
    }

    Ok(ApiResponse::ok(Message::new(
        "If an account exists for this email, a reset link has been sent",
    )))
}

/// `{frontend}/reset-password?token=...`
fn reset_link(frontend_url: &str, token: &str) -> Result<String, AppError> {
    let base = format!("{}/reset-password", frontend_url.trim_end_matches('/'));
    url::Url::parse_with_params(&base, &[("token", token)])
        .map(String::from)
        .map_err(|e| AppError::Internal(format!("invalid frontend url: {e}")))
}

/// Set a new password with a reset token.
#[instrument(skip(state, body))]
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.pool(), state.jwt())
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(ApiResponse::ok(Message::new("Password has been reset")))
}

/// The signed-in user.
async fn me(AuthUser(user): AuthUser) -> ApiResult<User> {
    Ok(ApiResponse::ok(user))
}

/// Update name, phone and avatar.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ProfileRequest>,
) -> ApiResult<User> {
    let name = check_name(&body.name)?;
    let user = UserRepository::new(state.pool())
        .update_profile(
            user.id,
            name,
            optional_text(body.phone.as_deref()),
            optional_text(body.avatar_url.as_deref()),
        )
        .await?;
    Ok(ApiResponse::ok(user))
}

/// Change the password of the signed-in user.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.pool(), state.jwt())
        .change_password(&user, body.current_password.as_deref(), &body.new_password)
        .await?;
    Ok(ApiResponse::ok(Message::new("Password changed")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_link_encodes_token() {
        let url = reset_link("https://techmart.vn/", "ab+cd").unwrap();
        assert_eq!(url, "https://techmart.vn/reset-password?token=ab%2Bcd");
    }

    #[test]
    fn test_check_name() {
        assert_eq!(check_name("  An  ").unwrap(), "An");
        assert!(check_name("   ").is_err());
        assert!(check_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }
}
