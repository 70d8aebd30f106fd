use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::identity::{IdentityId, IdentityKind, LocalIdentity};

/// Decoded session token payload.
///
/// Invariant: `Provider`-kind claims always carry `access_token`; both
/// [`SessionSigner::sign`] and [`SessionSigner::verify`] enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Local identity id.
    pub sub: IdentityId,
    pub handle: String,
    pub kind: IdentityKind,
    /// Provider access token, embedded for per-request re-validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Signs and verifies session tokens with a process-wide HS256 secret.
///
/// Pure and fast — `verify` runs on every authenticated request, so there is
/// no I/O here. The secret comes from configuration, never from source.
#[derive(Clone)]
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SessionSigner {
    /// Create a signer from the session secret and token lifetime.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>, ttl_seconds: u64) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    /// Token lifetime in seconds; also drives the persistent cookie expiry.
    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Sign a session token for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] when a `Provider`-kind identity is
    /// signed without an access token (the gate could never admit it).
    pub fn sign(
        &self,
        identity: &LocalIdentity,
        access_token: Option<String>,
    ) -> Result<String, Error> {
        if identity.kind == IdentityKind::Provider && access_token.is_none() {
            return Err(Error::InvalidToken);
        }

        let iat = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = SessionClaims {
            sub: identity.id.clone(),
            handle: identity.handle.clone(),
            kind: identity.kind,
            access_token,
            iat,
            exp: iat + self.ttl_seconds as i64,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| Error::InvalidToken)
    }

    /// Verify a session token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] for a bad signature, a malformed
    /// token, a past `exp`, or a `Provider`-kind payload with no embedded
    /// access token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| Error::InvalidToken)?;

        if claims.kind == IdentityKind::Provider && claims.access_token.is_none() {
            return Err(Error::InvalidToken);
        }

        Ok(claims)
    }
}
