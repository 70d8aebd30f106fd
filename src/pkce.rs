use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Code challenge derivation method (RFC 7636 §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// Challenge is the verifier itself. Only for providers without S256.
    Plain,
    /// `challenge = BASE64URL(SHA256(verifier))`.
    S256,
}

impl ChallengeMethod {
    /// Wire value for the `code_challenge_method` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

/// Ephemeral parameters for one authorization round-trip.
///
/// `state` and `code_verifier` must survive the redirect to the provider and
/// come back for the callback; the middleware binds them to the initiating
/// browser via short-lived private cookies. Single use.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationChallenge {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    pub method: ChallengeMethod,
}

impl AuthorizationChallenge {
    /// Generate a fresh state + verifier pair and derive the challenge.
    #[must_use]
    pub fn generate(method: ChallengeMethod) -> Self {
        let state = generate_state();
        let code_verifier = generate_code_verifier();
        let code_challenge = code_challenge(&code_verifier, method);
        Self {
            state,
            code_verifier,
            code_challenge,
            method,
        }
    }
}

/// Generates a cryptographically random code verifier for PKCE.
///
/// Returns a 64-character URL-safe string (RFC 7636 compliant, 43-128 chars).
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Derives the code challenge from a verifier under the given method.
#[must_use]
pub fn code_challenge(verifier: &str, method: ChallengeMethod) -> String {
    match method {
        ChallengeMethod::Plain => verifier.to_string(),
        ChallengeMethod::S256 => {
            let hash = Sha256::digest(verifier.as_bytes());
            URL_SAFE_NO_PAD.encode(hash)
        }
    }
}

/// Generates a cryptographically random state parameter for `OAuth2`.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
