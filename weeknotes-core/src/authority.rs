//! Token authority: produces a currently-valid access token.
//!
//! The resolution policy is strictly ordered:
//! 1. a cached [`TokenRecord`] whose expiry is in the future is
//!    returned as-is, with no network call;
//! 2. else a stored refresh token is exchanged for a new pair, and the
//!    full new record is persisted (including the rotated refresh
//!    token when the endpoint issues one);
//! 3. else the caller gets [`TokenError::BootstrapRequired`] and must
//!    explicitly run the interactive bootstrap (see
//!    [`TokenAuthority::bootstrap`](crate::bootstrap)).
//!
//! Keeping the interactive flow out of the steady-state path lets
//! unattended callers detect "bootstrap required" as a distinct
//! outcome instead of hanging on a browser prompt.

use std::sync::Arc;

use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, RedirectUrl, RefreshToken,
    TokenResponse, TokenUrl,
};

use crate::config::Credentials;
use crate::store::{CredentialKind, Secret, SecretStore};
use crate::token::{TokenError, TokenRecord};

/// OAuth endpoints and the local callback port.
///
/// Defaults point at the real Strava endpoints; tests substitute a
/// mock server.
#[derive(Debug, Clone)]
pub struct StravaEndpoints {
    /// Browser-navigated authorization endpoint.
    pub auth_url: String,
    /// Token endpoint for code exchange and refresh grants.
    pub token_url: String,
    /// Fixed local port the authorization listener binds.
    pub redirect_port: u16,
}

impl Default for StravaEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://www.strava.com/oauth/authorize".to_string(),
            token_url: "https://www.strava.com/oauth/token".to_string(),
            redirect_port: 9999,
        }
    }
}

impl StravaEndpoints {
    /// Redirect URI the authorization listener serves.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/exchange_token", self.redirect_port)
    }
}

/// Resolves access tokens against the secure store and the remote
/// token endpoint.
pub struct TokenAuthority<S: SecretStore> {
    store: Arc<S>,
    endpoints: StravaEndpoints,
}

impl<S: SecretStore> Clone for TokenAuthority<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            endpoints: self.endpoints.clone(),
        }
    }
}

impl<S: SecretStore + 'static> TokenAuthority<S> {
    /// Create an authority over the given store with default endpoints.
    pub fn new(store: S) -> Self {
        Self::with_endpoints(store, StravaEndpoints::default())
    }

    /// Create an authority with custom endpoints (tests, mostly).
    pub fn with_endpoints(store: S, endpoints: StravaEndpoints) -> Self {
        Self {
            store: Arc::new(store),
            endpoints,
        }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn endpoints(&self) -> &StravaEndpoints {
        &self.endpoints
    }

    /// Produce a currently-valid access token, refreshing if needed.
    ///
    /// Never launches the interactive flow; returns
    /// [`TokenError::BootstrapRequired`] when neither a cached nor a
    /// refreshable token exists.
    pub async fn access_token(&self, credentials: &Credentials) -> Result<Secret, TokenError> {
        let access_key = CredentialKind::AccessToken.key_for(&credentials.client_id);
        if let Some(raw) = self.store.get(&access_key).await? {
            let record = TokenRecord::from_json(raw.expose())?;
            if record.is_valid() {
                tracing::debug!("Using cached access token");
                return Ok(record.token);
            }
            tracing::info!("Cached access token expired at {}", record.expires_at);
        }

        let refresh_key = CredentialKind::RefreshToken.key_for(&credentials.client_id);
        if let Some(refresh_token) = self.store.get(&refresh_key).await? {
            tracing::info!("Refreshing access token");
            let record = self.refresh(credentials, refresh_token.expose()).await?;
            return Ok(record.token);
        }

        Err(TokenError::BootstrapRequired)
    }

    /// Exchange a refresh token for a new token pair and persist it.
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenRecord, TokenError> {
        let client = self.oauth_client(credentials)?;

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| TokenError::RefreshRejected {
                endpoint: self.endpoints.token_url.clone(),
                message: e.to_string(),
            })?;

        self.persist_grant(
            &credentials.client_id,
            response.access_token().secret(),
            response.expires_in(),
            response.refresh_token().map(|r| r.secret().as_str()),
            Some(refresh_token),
        )
        .await
    }

    /// Exchange an authorization code for the initial token pair and
    /// persist it. Called by the authorization listener.
    pub(crate) async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<TokenRecord, TokenError> {
        let redirect =
            RedirectUrl::new(self.endpoints.redirect_uri()).map_err(|e| {
                TokenError::InvalidEndpoint {
                    message: e.to_string(),
                }
            })?;
        let client = self.oauth_client(credentials)?.set_redirect_uri(redirect);

        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| TokenError::ExchangeRejected {
                endpoint: self.endpoints.token_url.clone(),
                message: e.to_string(),
            })?;

        self.persist_grant(
            &credentials.client_id,
            response.access_token().secret(),
            response.expires_in(),
            response.refresh_token().map(|r| r.secret().as_str()),
            None,
        )
        .await
    }

    /// Delete stored tokens for this client (keeps the client secret).
    pub async fn forget_tokens(&self, credentials: &Credentials) -> Result<(), TokenError> {
        let access_key = CredentialKind::AccessToken.key_for(&credentials.client_id);
        let refresh_key = CredentialKind::RefreshToken.key_for(&credentials.client_id);
        self.store.delete(&access_key).await?;
        self.store.delete(&refresh_key).await?;
        tracing::info!("Forgot stored tokens for client {}", credentials.client_id);
        Ok(())
    }

    /// Persist a token-issuing response as the new stored state.
    ///
    /// The refresh token written is the one the endpoint returned when
    /// it rotated, otherwise the one that was sent. The refresh token
    /// goes in before the access record so that anything polling the
    /// access key observes a complete pair.
    async fn persist_grant(
        &self,
        client_id: &str,
        access_token: &str,
        expires_in: Option<std::time::Duration>,
        new_refresh_token: Option<&str>,
        sent_refresh_token: Option<&str>,
    ) -> Result<TokenRecord, TokenError> {
        let expires_in = expires_in.ok_or_else(|| TokenError::MalformedResponse {
            message: "token response missing expires_in".to_string(),
        })?;

        let refresh_token = new_refresh_token
            .or(sent_refresh_token)
            .ok_or_else(|| TokenError::MalformedResponse {
                message: "token response missing refresh_token".to_string(),
            })?;

        let record =
            TokenRecord::from_expires_in(access_token, Utc::now(), expires_in.as_secs() as i64);

        let refresh_key = CredentialKind::RefreshToken.key_for(client_id);
        self.store
            .set(&refresh_key, &Secret::new(refresh_token))
            .await?;

        let access_key = CredentialKind::AccessToken.key_for(client_id);
        self.store
            .set(&access_key, &Secret::new(record.to_json()?))
            .await?;

        tracing::debug!("Persisted token record valid until {}", record.expires_at);

        Ok(record)
    }

    fn oauth_client(&self, credentials: &Credentials) -> Result<BasicClient, TokenError> {
        let auth_url = AuthUrl::new(self.endpoints.auth_url.clone()).map_err(|e| {
            TokenError::InvalidEndpoint {
                message: format!("auth URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(self.endpoints.token_url.clone()).map_err(|e| {
            TokenError::InvalidEndpoint {
                message: format!("token URL: {}", e),
            }
        })?;

        // Strava wants client_id/client_secret as form fields, not
        // HTTP basic auth.
        Ok(BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(
                credentials.client_secret.expose().to_string(),
            )),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SecretStore};

    fn credentials() -> Credentials {
        Credentials {
            client_id: "12345".to_string(),
            client_secret: Secret::new("shhh"),
        }
    }

    #[tokio::test]
    async fn cold_store_requires_bootstrap() {
        let authority = TokenAuthority::new(MemoryStore::new());
        let result = authority.access_token(&credentials()).await;
        assert!(matches!(result, Err(TokenError::BootstrapRequired)));
    }

    #[tokio::test]
    async fn valid_cached_record_is_returned_verbatim() {
        let store = MemoryStore::new();
        let record = TokenRecord::new("cached-token", Utc::now() + chrono::Duration::hours(1));
        store
            .set(
                "12345.access_token",
                &Secret::new(record.to_json().unwrap()),
            )
            .await
            .unwrap();

        let authority = TokenAuthority::new(store);
        let token = authority.access_token(&credentials()).await.unwrap();
        assert_eq!(token.expose(), "cached-token");
    }

    #[tokio::test]
    async fn forget_tokens_clears_both_keys() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store
            .set("12345.access_token", &Secret::new("{}"))
            .await
            .unwrap();
        store
            .set("12345.refresh_token", &Secret::new("r"))
            .await
            .unwrap();

        let authority = TokenAuthority::new(store);
        authority.forget_tokens(&credentials()).await.unwrap();

        assert!(handle.get("12345.access_token").await.unwrap().is_none());
        assert!(handle.get("12345.refresh_token").await.unwrap().is_none());
    }
}
