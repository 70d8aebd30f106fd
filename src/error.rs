/// Crate-level errors.
///
/// Every authentication failure collapses to an opaque "Not Authenticated"
/// at the HTTP boundary; these variants exist so the internal cause stays
/// distinguishable for logging.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Token exchange with the provider failed (bad code, bad credentials,
    /// non-2xx, malformed body).
    #[error("token exchange failed: {detail}")]
    Exchange {
        status: Option<u16>,
        detail: String,
    },

    /// The provider's userinfo endpoint rejected the access token or
    /// returned an unusable body.
    #[error("profile fetch failed: {detail}")]
    Profile {
        status: Option<u16>,
        detail: String,
    },

    /// Transport-level failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session token failed verification: bad signature, malformed,
    /// expired, or missing a required claim.
    #[error("session token invalid")]
    InvalidToken,

    /// Session token verified but the local identity no longer exists.
    #[error("local identity not found")]
    IdentityNotFound,

    /// Provider-backed session no longer matches provider state
    /// (revoked token or remote id mismatch).
    #[error("provider re-validation failed")]
    Revalidation,

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
