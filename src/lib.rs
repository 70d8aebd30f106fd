#![doc = include_str!("../README.md")]

pub mod error;
pub mod identity;
pub mod middleware;
pub mod oauth;
pub mod pkce;
pub mod session;

// Re-exports for convenient access
pub use error::Error;
pub use identity::{
    IdentityId, IdentityKind, IdentityStore, LocalIdentity, MemoryIdentityStore, RemoteIdentity,
    StoreError,
};
pub use middleware::{AuthConfig, AuthError, CurrentIdentity, auth_routes};
pub use oauth::{ProviderClient, ProviderConfig, TokenResponse};
pub use pkce::{
    AuthorizationChallenge, ChallengeMethod, code_challenge, generate_code_verifier,
    generate_state,
};
pub use session::{SessionClaims, SessionSigner};
