//! Credential storage trait and the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::authenticator::AuthError;

/// Errors from credential administration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No credential with this id exists.
    #[error("credential not found: {0}")]
    NotFound(String),

    /// A credential with this id, or with the same secret, already exists.
    #[error("duplicate credential: {0}")]
    Duplicate(String),
}

/// Metadata for a long-lived opaque key.
///
/// The secret itself is never part of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Stable identifier used for revocation and audit.
    pub id: String,

    /// Display name; becomes the identity subject.
    pub name: String,

    /// Role references and/or permission strings.
    pub permissions: Vec<String>,

    /// When the credential was created.
    pub created_at: DateTime<Utc>,

    /// After this instant the credential is invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Last successful validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Create a record that never expires.
    pub fn new(id: impl Into<String>, name: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        }
    }

    /// Set an expiry instant.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check whether the record has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}

/// Trait for credential store implementations.
///
/// Stores validate raw secrets and revoke credentials by id. Validation
/// must not reveal, through timing, which stored secrets share a prefix
/// with the candidate.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Validate a raw secret and return its record.
    ///
    /// On success the record's `last_used_at` is updated.
    async fn validate(&self, secret: &str) -> Result<CredentialRecord, AuthError>;

    /// Remove a credential by id.
    async fn revoke(&self, id: &str) -> Result<(), StoreError>;
}

struct StoredCredential {
    digest: [u8; 32],
    record: CredentialRecord,
}

/// In-memory credential store.
///
/// Secrets are kept as SHA-256 digests and compared in constant time against
/// every entry on each lookup. A single coarse lock serializes validation and
/// revocation, which is adequate for the small key sets this store targets.
pub struct MemoryCredentialStore {
    entries: Mutex<Vec<StoredCredential>>,
}

impl MemoryCredentialStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a secret with its record.
    ///
    /// Fails if the id or the secret is already registered.
    pub fn add(&self, secret: &str, record: CredentialRecord) -> Result<(), StoreError> {
        let digest = digest(secret);
        let mut entries = self.entries.lock();

        if entries.iter().any(|e| e.record.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        if entries.iter().any(|e| bool::from(e.digest[..].ct_eq(&digest[..]))) {
            return Err(StoreError::Duplicate(record.id));
        }

        log::debug!("registered credential {} ({})", record.id, record.name);
        entries.push(StoredCredential { digest, record });
        Ok(())
    }

    /// Snapshot of all records. Secrets are not included.
    pub fn records(&self) -> Vec<CredentialRecord> {
        self.entries.lock().iter().map(|e| e.record.clone()).collect()
    }

    /// Look up a record by id.
    pub fn record(&self, id: &str) -> Option<CredentialRecord> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone())
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store holds no credentials.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn validate_at(&self, secret: &str, now: DateTime<Utc>) -> Result<CredentialRecord, AuthError> {
        let candidate = digest(secret);
        let mut entries = self.entries.lock();

        // Visit every entry so lookup time does not depend on match position.
        let mut found = None;
        for (index, entry) in entries.iter().enumerate() {
            let matched: bool = entry.digest[..].ct_eq(&candidate[..]).into();
            if matched && found.is_none() {
                found = Some(index);
            }
        }

        let Some(index) = found else {
            log::warn!("invalid API key attempted (prefix {})", mask_key(secret));
            return Err(AuthError::UnknownCredential);
        };

        let record = &mut entries[index].record;
        if record.is_expired_at(now) {
            log::warn!("expired API key attempted (key_id {})", record.id);
            return Err(AuthError::Expired);
        }

        record.last_used_at = Some(now);
        log::info!(
            "API key authenticated (key_id {}, key_name {})",
            record.id,
            record.name
        );
        Ok(record.clone())
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn validate(&self, secret: &str) -> Result<CredentialRecord, AuthError> {
        self.validate_at(secret, Utc::now())
    }

    async fn revoke(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let original_len = entries.len();
        entries.retain(|e| e.record.id != id);

        if entries.len() < original_len {
            log::info!("API key revoked (key_id {})", id);
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Mask a key for logging, keeping at most the first 8 characters.
pub fn mask_key(key: &str) -> String {
    if key.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = key.chars().take(8).collect();
    format!("{}****", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn store_with(secret: &str, id: &str) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store
            .add(secret, CredentialRecord::new(id, "Test Key", vec!["k8s:pods:list".into()]))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_validate_known_key() {
        let store = store_with("demo-user-key-12345", "user-key");

        let record = store.validate("demo-user-key-12345").await.unwrap();
        assert_eq!(record.id, "user-key");
        assert_eq!(record.name, "Test Key");
        assert!(record.last_used_at.is_some());

        // The side effect is visible through the store as well
        assert!(store.record("user-key").unwrap().last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_validate_unknown_key() {
        let store = store_with("demo-user-key-12345", "user-key");

        let err = store.validate("demo-user-key-1234").await.unwrap_err();
        assert_eq!(err, AuthError::UnknownCredential);
        assert!(store.record("user-key").unwrap().last_used_at.is_none());
    }

    #[tokio::test]
    async fn test_validate_expired_key() {
        let store = MemoryCredentialStore::new();
        let record = CredentialRecord::new("old", "Old Key", vec![])
            .with_expiry(Utc::now() - Duration::minutes(5));
        store.add("expired-secret", record).unwrap();

        let err = store.validate("expired-secret").await.unwrap_err();
        assert_eq!(err, AuthError::Expired);
        assert_eq!(err.public_message(), "authentication failed");
    }

    #[test]
    fn test_expiry_boundary() {
        let at = Utc::now();
        let record = CredentialRecord::new("k", "K", vec![]).with_expiry(at);

        assert!(!record.is_expired_at(at));
        assert!(record.is_expired_at(at + Duration::seconds(1)));
        assert!(!CredentialRecord::new("k", "K", vec![]).is_expired_at(at));
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = store_with("secret-one-value", "one");

        store.revoke("one").await.unwrap();
        assert!(store.is_empty());

        let err = store.validate("secret-one-value").await.unwrap_err();
        assert_eq!(err, AuthError::UnknownCredential);
    }

    #[tokio::test]
    async fn test_revoke_nonexistent() {
        let store = MemoryCredentialStore::new();
        let err = store.revoke("ghost").await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("ghost".to_string()));
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let store = store_with("secret-one-value", "one");

        let same_id = store.add("another-secret", CredentialRecord::new("one", "X", vec![]));
        assert!(matches!(same_id, Err(StoreError::Duplicate(_))));

        let same_secret = store.add("secret-one-value", CredentialRecord::new("two", "Y", vec![]));
        assert!(matches!(same_secret, Err(StoreError::Duplicate(_))));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_records_exclude_secrets() {
        let store = store_with("super-secret-value", "one");
        let json = serde_json::to_string(&store.records()).unwrap();
        assert!(!json.contains("super-secret-value"));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("demo-admin-key-67890"), "demo-adm****");
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("exactly8"), "****");
    }

    #[tokio::test]
    async fn test_concurrent_validate_and_revoke() {
        let store = Arc::new(store_with("shared-secret-key", "shared"));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.validate("shared-secret-key").await
            }));
        }
        let revoker = {
            let store = store.clone();
            tokio::spawn(async move { store.revoke("shared").await })
        };

        for handle in handles {
            // Each validation either saw the key or did not; none may panic
            match handle.await.unwrap() {
                Ok(record) => assert_eq!(record.id, "shared"),
                Err(err) => assert_eq!(err, AuthError::UnknownCredential),
            }
        }
        revoker.await.unwrap().unwrap();

        assert!(store.is_empty());
        assert!(store.validate("shared-secret-key").await.is_err());
    }
}
