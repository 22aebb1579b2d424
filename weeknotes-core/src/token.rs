//! Token records persisted in the secure store.
//!
//! A [`TokenRecord`] pairs an access token with its absolute expiry,
//! computed at issuance time (`issued_at + expires_in`). Records are
//! always replaced wholesale when a token-issuing response arrives,
//! never mutated in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Secret, StoreError};

/// Error type for token lifecycle operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No cached token and no refresh token: the interactive bootstrap
    /// must be run before a token can be issued.
    #[error("no cached or refreshable token; interactive authorization required")]
    BootstrapRequired,

    /// The token endpoint rejected a refresh-token grant.
    #[error("token refresh rejected by {endpoint}: {message}")]
    RefreshRejected { endpoint: String, message: String },

    /// The token endpoint rejected an authorization-code exchange.
    #[error("code exchange rejected by {endpoint}: {message}")]
    ExchangeRejected { endpoint: String, message: String },

    /// A token-endpoint response lacked a required field.
    #[error("malformed token response: {message}")]
    MalformedResponse { message: String },

    /// An OAuth endpoint URL could not be parsed.
    #[error("invalid endpoint URL: {message}")]
    InvalidEndpoint { message: String },

    /// The persisted token record could not be decoded.
    #[error("stored token record is not valid JSON: {message}")]
    InvalidRecord { message: String },

    /// The local authorization listener failed.
    #[error("authorization listener failed: {message}")]
    ListenerFailed { message: String },

    /// Storage error during token operations.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// An access token together with its absolute expiry.
///
/// Serialized as `{"token": ..., "expires_at": ...}` under the
/// `{client_id}.access_token` store key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token value.
    pub token: Secret,

    /// When the token stops being valid, computed at issuance.
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Create a record with an explicit expiry.
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: Secret::new(token),
            expires_at,
        }
    }

    /// Create a record from a token-endpoint response's relative
    /// `expires_in`, anchored at the given issuance time.
    pub fn from_expires_in(
        token: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
    ) -> Self {
        Self::new(token, issued_at + Duration::seconds(expires_in_secs))
    }

    /// Whether the token is still valid at the given instant.
    ///
    /// The stored absolute expiry is the single source of truth; the
    /// check is strict, with no refresh-ahead buffer.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether the token is valid right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> Result<String, TokenError> {
        serde_json::to_string(self).map_err(|e| TokenError::InvalidRecord {
            message: e.to_string(),
        })
    }

    /// Deserialize a stored record.
    pub fn from_json(raw: &str) -> Result<Self, TokenError> {
        serde_json::from_str(raw).map_err(|e| TokenError::InvalidRecord {
            message: e.to_string(),
        })
    }
}
