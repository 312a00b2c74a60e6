//! Google ID token verification via the tokeninfo endpoint.

use serde::Deserialize;

use super::AuthError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified identity from a Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Stable Google account id (`sub`).
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Fields of the tokeninfo response we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    /// Google sends this as the string `"true"`.
    #[serde(default)]
    email_verified: serde_json::Value,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn into_identity(self, client_id: &str) -> Result<GoogleIdentity, AuthError> {
        if self.aud != client_id {
            tracing::warn!(aud = %self.aud, "Google token issued for another client");
            return Err(AuthError::GoogleTokenInvalid);
        }
        let verified = match &self.email_verified {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            _ => false,
        };
        let email = self
            .email
            .filter(|_| verified)
            .ok_or(AuthError::GoogleTokenInvalid)?;

        Ok(GoogleIdentity {
            subject: self.sub,
            email,
            name: self.name.filter(|n| !n.trim().is_empty()),
            picture: self.picture,
        })
    }
}

/// Verifies Google ID tokens for one OAuth client.
#[derive(Clone)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
}

impl GoogleVerifier {
    #[must_use]
    pub const fn new(http: reqwest::Client, client_id: String) -> Self {
        Self { http, client_id }
    }

    /// Verify an ID token and return the identity it asserts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GoogleTokenInvalid` if Google rejects the token or
    /// it was not issued for this client, and `AuthError::GoogleUnavailable`
    /// if Google cannot be reached.
    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AuthError> {
        let url = url::Url::parse_with_params(TOKENINFO_URL, [("id_token", id_token)])
            .map_err(|e| AuthError::GoogleUnavailable(e.to_string()))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::GoogleUnavailable(e.to_string()))?;

        if response.status().is_client_error() {
            return Err(AuthError::GoogleTokenInvalid);
        }
        if !response.status().is_success() {
            return Err(AuthError::GoogleUnavailable(format!(
                "tokeninfo returned {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::GoogleUnavailable(e.to_string()))?;
        info.into_identity(&self.client_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(json: serde_json::Value) -> TokenInfo {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_accepts_matching_audience() {
        let identity = info(serde_json::json!({
            "aud": "client-1.apps.googleusercontent.com",
            "sub": "1098",
            "email": "lan@gmail.com",
            "email_verified": "true",
            "name": "Lan Nguyen",
            "picture": "https://lh3.googleusercontent.com/a/x"
        }))
        .into_identity("client-1.apps.googleusercontent.com")
        .unwrap();
        assert_eq!(identity.subject, "1098");
        assert_eq!(identity.email, "lan@gmail.com");
    }

    #[test]
    fn test_rejects_other_audience() {
        let result = info(serde_json::json!({
            "aud": "someone-else",
            "sub": "1",
            "email": "a@b.co",
            "email_verified": true
        }))
        .into_identity("client-1");
        assert!(matches!(result, Err(AuthError::GoogleTokenInvalid)));
    }

    #[test]
    fn test_rejects_unverified_email() {
        let result = info(serde_json::json!({
            "aud": "client-1",
            "sub": "1",
            "email": "a@b.co",
            "email_verified": "false"
        }))
        .into_identity("client-1");
        assert!(matches!(result, Err(AuthError::GoogleTokenInvalid)));
    }
}
