//! Opaque API key authentication.

use std::sync::Arc;

use async_trait::async_trait;

use super::authenticator::{AuthError, Authenticator, SCHEME_KEY};
use super::store::CredentialStore;
use crate::identity::Identity;

/// Authenticates opaque keys against a [`CredentialStore`].
///
/// The identity subject is the key's display name and its permissions are
/// the record's permissions, unchanged.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    store: Arc<dyn CredentialStore>,
}

impl ApiKeyAuthenticator {
    /// Create an authenticator backed by a shared store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Identity, AuthError> {
        let record = self.store.validate(credential).await?;

        let mut identity = Identity::new(SCHEME_KEY, record.name, record.permissions)
            .with_attribute("key_id", record.id)
            .with_attribute("created_at", record.created_at.to_rfc3339());
        if let Some(last_used) = record.last_used_at {
            identity = identity.with_attribute("last_used_at", last_used.to_rfc3339());
        }
        if let Some(expires) = record.expires_at {
            identity = identity.with_attribute("expires_at", expires.to_rfc3339());
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialRecord, MemoryCredentialStore};

    fn authenticator() -> ApiKeyAuthenticator {
        let store = MemoryCredentialStore::new();
        store
            .add(
                "demo-user-key-12345",
                CredentialRecord::new(
                    "user-key",
                    "Developer Key",
                    vec!["k8s:pods:list".into(), "developer".into()],
                ),
            )
            .unwrap();
        ApiKeyAuthenticator::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_maps_record_to_identity() {
        let identity = authenticator()
            .authenticate("demo-user-key-12345")
            .await
            .unwrap();

        assert_eq!(identity.scheme, "key");
        assert_eq!(identity.subject, "Developer Key");
        assert_eq!(identity.permissions, vec!["k8s:pods:list", "developer"]);
        assert_eq!(
            identity.attribute("key_id").and_then(|v| v.as_str()),
            Some("user-key")
        );
        assert!(identity.attribute("last_used_at").is_some());
    }

    #[tokio::test]
    async fn test_unknown_key_fails() {
        let err = authenticator().authenticate("nope").await.unwrap_err();
        assert_eq!(err, AuthError::UnknownCredential);
    }
}
