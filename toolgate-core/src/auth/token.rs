//! Signed token authentication.
//!
//! Tokens use the compact JWS layout (`header.claims.signature`, each part
//! base64url without padding) signed with an HMAC over the shared secret.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use super::authenticator::{AuthError, Authenticator, SCHEME_TOKEN};
use crate::identity::Identity;

/// Issuer written into tokens by default.
pub const DEFAULT_ISSUER: &str = "toolgate";

/// HMAC signing algorithms.
///
/// Verification accepts any member of this family. Tokens whose header names
/// anything else (`none`, RSA, EC, ...) are rejected before the signature is
/// looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    #[serde(rename = "HS256")]
    Hs256,

    /// HMAC with SHA-384.
    #[serde(rename = "HS384")]
    Hs384,

    /// HMAC with SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
}

impl SigningAlgorithm {
    /// Header name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// Parse a header `alg` value, accepting only the HMAC family.
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "HS256" => Some(Self::Hs256),
            "HS384" => Some(Self::Hs384),
            "HS512" => Some(Self::Hs512),
            _ => None,
        }
    }

    fn sign(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthError> {
        match self {
            Self::Hs256 => mac_sign::<Hmac<Sha256>>(key, data),
            Self::Hs384 => mac_sign::<Hmac<Sha384>>(key, data),
            Self::Hs512 => mac_sign::<Hmac<Sha512>>(key, data),
        }
    }

    fn verify(self, key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, AuthError> {
        match self {
            Self::Hs256 => mac_verify::<Hmac<Sha256>>(key, data, signature),
            Self::Hs384 => mac_verify::<Hmac<Sha384>>(key, data, signature),
            Self::Hs512 => mac_verify::<Hmac<Sha512>>(key, data, signature),
        }
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mac_sign<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| AuthError::Internal(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + KeyInit>(key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, AuthError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| AuthError::Internal(e.to_string()))?;
    mac.update(data);
    // verify_slice compares in constant time
    Ok(mac.verify_slice(signature).is_ok())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Stable user identifier.
    pub sub: String,

    /// Display name; becomes the identity subject.
    pub username: String,

    /// Role references and/or permission strings.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Issued at (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expires at (seconds since the epoch). Required.
    pub exp: i64,

    /// Not valid before (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authenticates HMAC-signed tokens and issues new ones.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use toolgate_core::auth::{Authenticator, TokenAuthenticator};
///
/// # tokio_test::block_on(async {
/// let auth = TokenAuthenticator::new("a-long-shared-secret-for-signing");
/// let token = auth
///     .issue("u-1", "alice", vec!["k8s:pods:list".into()], Duration::hours(1))
///     .unwrap();
///
/// let identity = auth.authenticate(&token).await.unwrap();
/// assert_eq!(identity.subject, "alice");
/// # });
/// ```
#[derive(Clone)]
pub struct TokenAuthenticator {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
    issuer: String,
    leeway: Duration,
}

impl TokenAuthenticator {
    /// Create an authenticator using HS256 and the default issuer.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let secret = secret.into();
        if secret.len() < 32 {
            log::warn!(
                "token signing secret is only {} bytes; use at least 32",
                secret.len()
            );
        }
        Self {
            secret,
            algorithm: SigningAlgorithm::default(),
            issuer: DEFAULT_ISSUER.to_string(),
            leeway: Duration::zero(),
        }
    }

    /// Set the algorithm used when issuing tokens.
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the issuer written into and required from tokens.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Allow clock skew when checking `exp` and `nbf` during decoding.
    ///
    /// The final expiry check in [`Authenticator::authenticate`] ignores
    /// leeway.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// The issuer this authenticator writes and accepts.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token valid from now for `lifetime`.
    pub fn issue(
        &self,
        user_id: impl Into<String>,
        username: impl Into<String>,
        permissions: Vec<String>,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: user_id.into(),
            username: username.into(),
            permissions,
            iat: Some(now),
            exp: now + lifetime.num_seconds(),
            nbf: Some(now),
            iss: Some(self.issuer.clone()),
        };
        self.encode(&claims)
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let header = TokenHeader {
            alg: self.algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
        };

        let header = encode_part(&header)?;
        let payload = encode_part(claims)?;
        let signing_input = format!("{}.{}", header, payload);
        let signature = self.algorithm.sign(&self.secret, signing_input.as_bytes())?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify the signature and temporal claims, returning the claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_at(token, Utc::now())
    }

    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let malformed = || AuthError::MalformedToken("expected three segments".into());
        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(malformed)?;
        let mut parts = signing_input.split('.');
        let (Some(header), Some(payload), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };

        let header: TokenHeader = decode_part(header)?;
        let algorithm = SigningAlgorithm::from_header(&header.alg)
            .ok_or_else(|| AuthError::AlgorithmMismatch(header.alg.clone()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| AuthError::MalformedToken(format!("signature: {}", e)))?;
        if !algorithm.verify(&self.secret, signing_input.as_bytes(), &signature)? {
            return Err(AuthError::BadSignature);
        }

        let claims: TokenClaims = decode_part(payload)?;
        let now = now.timestamp();
        let leeway = self.leeway.num_seconds();

        if now > claims.exp + leeway {
            return Err(AuthError::Expired);
        }
        if matches!(claims.nbf, Some(nbf) if now + leeway < nbf) {
            return Err(AuthError::NotYetValid);
        }
        if let Some(iss) = &claims.iss {
            if iss != &self.issuer {
                return Err(AuthError::MalformedToken(format!("unexpected issuer {}", iss)));
            }
        }

        Ok(claims)
    }

    fn authenticate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = self.decode_at(token, now)?;

        // Checked again without leeway, independent of decode.
        if now.timestamp() >= claims.exp {
            log::warn!("expired token attempted (username {})", claims.username);
            return Err(AuthError::Expired);
        }

        log::info!(
            "token authenticated (user_id {}, username {})",
            claims.sub,
            claims.username
        );

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        Ok(Identity::new(SCHEME_TOKEN, claims.username, claims.permissions)
            .with_attribute("user_id", claims.sub)
            .with_attribute("expires_at", expires_at))
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Identity, AuthError> {
        self.authenticate_at(credential, Utc::now()).map_err(|err| {
            log::warn!("token validation failed: {}", err);
            err
        })
    }
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))
}
