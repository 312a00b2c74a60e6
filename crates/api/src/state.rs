//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::cache::CatalogCache;
use crate::config::ApiConfig;
use crate::services::auth::{GoogleVerifier, JwtKeys};
use crate::services::email::EmailService;
use crate::services::momo::MomoClient;

/// Timeout for outbound calls to MoMo and Google.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] SmtpError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    jwt: JwtKeys,
    momo: Option<MomoClient>,
    google: Option<GoogleVerifier>,
    email: Option<EmailService>,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations (MoMo, Google sign-in, SMTP) are only built when
    /// their configuration group is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the SMTP transport cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("techmart-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let jwt = JwtKeys::new(&config.jwt);
        let momo = config.momo.clone().map(|momo| {
            MomoClient::new(http.clone(), momo, &config.base_url, &config.frontend_url)
        });
        let google = config
            .google_client_id
            .clone()
            .map(|client_id| GoogleVerifier::new(http.clone(), client_id));
        let email = config.email.as_ref().map(EmailService::new).transpose()?;

        if momo.is_none() {
            tracing::warn!("MoMo is not configured; MoMo checkout is disabled");
        }
        if email.is_none() {
            tracing::warn!("SMTP is not configured; emails will be logged and skipped");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                momo,
                google,
                email,
                catalog: CatalogCache::new(),
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Token signing and verification keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// MoMo client, if MoMo is configured.
    #[must_use]
    pub fn momo(&self) -> Option<&MomoClient> {
        self.inner.momo.as_ref()
    }

    /// Google ID token verifier, if Google sign-in is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleVerifier> {
        self.inner.google.as_ref()
    }

    /// Email sender, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Category and brand list cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}
