//! OS keyring-backed secret storage implementation.

use async_trait::async_trait;
use keyring::Entry;

use super::{Secret, SecretStore, StoreError, KEYRING_SERVICE};

/// OS keyring-backed secret store.
///
/// Uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// Entries live under the fixed [`KEYRING_SERVICE`] namespace with the
/// `{client_id}.{field}` key as the entry name.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Create a keyring store under the application namespace.
    ///
    /// Returns an error if the keyring backend is not available on
    /// this platform. Store unavailability is fatal for a run; secrets
    /// never fall back to plaintext.
    pub fn new() -> Result<Self, StoreError> {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Create a keyring store under a custom service namespace.
    pub fn with_service(service_name: &str) -> Result<Self, StoreError> {
        // Probe the backend so unavailability surfaces at construction
        // rather than on the first credential access.
        match Entry::new(service_name, "__probe__") {
            Ok(_) => Ok(Self {
                service_name: service_name.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, key).map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry for {}: {}", key, e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        let entry = self.entry(key)?;

        match entry.get_password() {
            Ok(password) => Ok(Some(Secret::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(StoreError::BackendError {
                message: format!("ambiguous keyring entry for key: {}", key),
            }),
            Err(keyring::Error::PlatformFailure(e)) => Err(StoreError::BackendError {
                message: format!("platform keyring failure: {}", e),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let entry = self.entry(key)?;

        entry
            .set_password(secret.expose())
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to set keyring password: {}", e),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let entry = self.entry(key)?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Idempotent delete
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests skip silently when the platform has no usable
    // keyring, to avoid CI failures and credential pollution.

    #[tokio::test]
    async fn keyring_roundtrip_when_available() {
        let store = match KeyringStore::with_service("blog.almad.weeknotes.test") {
            Ok(s) => s,
            Err(_) => return,
        };

        let key = format!(
            "test.{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );

        if store.set(&key, &Secret::new("test-value")).await.is_err() {
            return;
        }

        match store.get(&key).await {
            Ok(Some(retrieved)) => {
                assert_eq!(retrieved.expose(), "test-value");
                store.delete(&key).await.unwrap();
                assert!(store.get(&key).await.unwrap().is_none());
            }
            // Headless systems may accept the set without persisting.
            _ => {
                let _ = store.delete(&key).await;
            }
        }
    }

    #[tokio::test]
    async fn keyring_get_nonexistent() {
        let store = match KeyringStore::with_service("blog.almad.weeknotes.test-missing") {
            Ok(s) => s,
            Err(_) => return,
        };

        assert!(store.get("12345.access_token").await.unwrap().is_none());
    }
}
