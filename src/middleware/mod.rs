//! Plug-and-play `OAuth2` authentication middleware for Axum.
//!
//! Wires the crate's core (PKCE challenge, token exchange, identity upsert,
//! session signing) into mountable routes plus a request extractor.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sparrow_auth::middleware::{AuthConfig, CurrentIdentity, auth_routes};
//!
//! // 1. Implement IdentityStore for your persistence layer
//! // 2. Configure from environment (fail-fast on anything missing)
//! let config = AuthConfig::from_env()?;
//!
//! // 3. Mount auth routes
//! let app = axum::Router::new()
//!     .merge(auth_routes(config, identity_store));
//!
//! // 4. Use the CurrentIdentity extractor in your own handlers
//! async fn profile(CurrentIdentity(identity): CurrentIdentity) -> String {
//!     identity.handle
//! }
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;

pub use config::AuthConfig;
pub use error::AuthError;
pub use extractor::CurrentIdentity;
pub use routes::auth_routes;
pub use state::AuthState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
