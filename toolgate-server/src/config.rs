//! Server configuration file and gate assembly.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! request_timeout_secs = 30
//!
//! [auth]
//! token_secret = "change-me-to-at-least-32-bytes-of-secret"
//! issuer = "toolgate"
//!
//! [[auth.keys]]
//! id = "admin-key"
//! name = "Admin Key"
//! secret = "demo-admin-key"
//! permissions = ["k8s:*"]
//!
//! [policy]
//! path = "policy.toml"
//!
//! [audit]
//! sink = "file"
//! path = "audit.log"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use toolgate_core::audit::{AuditLogger, ChannelAuditSink, LogAuditSink};
use toolgate_core::auth::{
    ApiKeyAuthenticator, AuthDispatcher, CredentialRecord, MemoryCredentialStore,
    SigningAlgorithm, StoreError, TokenAuthenticator, DEFAULT_ISSUER, SCHEME_KEY, SCHEME_TOKEN,
};
use toolgate_core::permission::{
    Authorizer, Policy, PolicyError, PolicyHandle, SUPERUSER_PERMISSION,
};
use toolgate_core::{SecurityGate, ToolExecutor};

/// Environment variable that overrides `auth.token_secret`.
pub const TOKEN_SECRET_ENV: &str = "TOOLGATE_TOKEN_SECRET";

/// Errors while loading configuration or assembling the gate.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub policy: PolicyConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Executor deadline per request. Zero disables it.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signed tokens. The token scheme is disabled without it.
    pub token_secret: Option<String>,
    pub issuer: String,
    /// `HS256`, `HS384` or `HS512`.
    pub algorithm: String,
    /// Clock skew allowed when decoding tokens.
    pub leeway_secs: u64,
    /// Only accept `role:<name>` role references.
    pub strict_role_references: bool,
    pub superuser: String,
    pub keys: Vec<KeyConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            issuer: DEFAULT_ISSUER.to_string(),
            algorithm: SigningAlgorithm::default().as_str().to_string(),
            leeway_secs: 0,
            strict_role_references: false,
            superuser: SUPERUSER_PERMISSION.to_string(),
            keys: Vec::new(),
        }
    }
}

/// An opaque key seeded into the credential store at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    pub id: String,
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Role document (`.toml`, `.json` or `.yaml`). No roles are defined without it.
    pub path: Option<PathBuf>,
}

/// Where audit lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    #[default]
    Stdout,
    File,
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub sink: AuditSinkKind,
    /// Required when `sink = "file"`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A gate assembled from configuration, with handles to its shared parts.
pub struct GateParts {
    pub gate: SecurityGate,
    pub store: Arc<MemoryCredentialStore>,
    pub policy: Arc<PolicyHandle>,
    /// Background audit writer for the stdout and file sinks.
    pub audit_task: Option<JoinHandle<std::io::Result<()>>>,
}

impl Config {
    /// Parse a TOML config document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a config file and apply the environment override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?
            .with_token_secret_override(std::env::var(TOKEN_SECRET_ENV).ok());
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace the token secret when `secret` is set and non-empty.
    pub fn with_token_secret_override(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.auth.token_secret = Some(secret);
        }
        self
    }

    /// Executor deadline, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.server.request_timeout_secs > 0)
            .then(|| Duration::from_secs(self.server.request_timeout_secs))
    }

    /// A credential store seeded with the configured keys.
    pub fn credential_store(&self) -> Result<MemoryCredentialStore, ConfigError> {
        let store = MemoryCredentialStore::new();
        for key in &self.auth.keys {
            let mut record = CredentialRecord::new(&key.id, &key.name, key.permissions.clone());
            if let Some(expires_at) = key.expires_at {
                record = record.with_expiry(expires_at);
            }
            store.add(&key.secret, record)?;
        }
        Ok(store)
    }

    /// The token authenticator, if a secret is configured.
    pub fn token_authenticator(&self) -> Result<Option<TokenAuthenticator>, ConfigError> {
        let Some(secret) = self.auth.token_secret.as_deref() else {
            return Ok(None);
        };
        let algorithm = SigningAlgorithm::from_header(&self.auth.algorithm).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unsupported token algorithm '{}'",
                self.auth.algorithm
            ))
        })?;
        let leeway = chrono::Duration::seconds(
            i64::try_from(self.auth.leeway_secs)
                .map_err(|_| ConfigError::Invalid("leeway_secs is too large".into()))?,
        );

        Ok(Some(
            TokenAuthenticator::new(secret)
                .with_algorithm(algorithm)
                .with_issuer(&self.auth.issuer)
                .with_leeway(leeway),
        ))
    }

    /// Load the role document. A parse failure is an error.
    pub fn load_policy(&self) -> Result<Policy, ConfigError> {
        match &self.policy.path {
            Some(path) => Ok(Policy::load(path)?),
            None => {
                log::warn!("no policy path configured; role references grant nothing");
                Ok(Policy::default())
            }
        }
    }

    /// Build the audit logger. Must be called inside a Tokio runtime.
    ///
    /// The stdout and file sinks write from a background task, returned
    /// alongside the logger so it can be drained on shutdown.
    pub async fn audit_logger(
        &self,
    ) -> Result<(AuditLogger, Option<JoinHandle<std::io::Result<()>>>), ConfigError> {
        match self.audit.sink {
            AuditSinkKind::Stdout => {
                let (sink, handle) = ChannelAuditSink::spawn(tokio::io::stdout());
                Ok((AuditLogger::new(Arc::new(sink)), Some(handle)))
            }
            AuditSinkKind::Log => Ok((AuditLogger::new(Arc::new(LogAuditSink)), None)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("audit.path is required for the file sink".into())
                })?;
                let file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                let (sink, handle) = ChannelAuditSink::spawn(file);
                Ok((AuditLogger::new(Arc::new(sink)), Some(handle)))
            }
        }
    }

    /// Assemble a gate around `executor`.
    pub async fn build_gate(&self, executor: Arc<dyn ToolExecutor>) -> Result<GateParts, ConfigError> {
        let store = Arc::new(self.credential_store()?);
        let mut dispatcher = AuthDispatcher::new();
        dispatcher.register(SCHEME_KEY, Arc::new(ApiKeyAuthenticator::new(store.clone())));
        match self.token_authenticator()? {
            Some(tokens) => dispatcher.register(SCHEME_TOKEN, Arc::new(tokens)),
            None => log::warn!("no token secret configured; bearer tokens are rejected"),
        }

        let policy = Arc::new(PolicyHandle::new(self.load_policy()?));
        let authorizer = Authorizer::new(policy.clone())
            .with_superuser(&self.auth.superuser)
            .strict_role_references(self.auth.strict_role_references);

        let (audit, audit_task) = self.audit_logger().await?;

        log::info!(
            "gate ready: {} keys, {} roles, schemes {:?}",
            store.len(),
            policy.snapshot().roles().len(),
            dispatcher.schemes()
        );

        let gate = SecurityGate::builder(executor)
            .dispatcher(dispatcher)
            .authorizer(authorizer)
            .audit(audit)
            .build();

        Ok(GateParts {
            gate,
            store,
            policy,
            audit_task,
        })
    }
}
