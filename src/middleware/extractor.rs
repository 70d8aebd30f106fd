use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::error::AuthError;
use super::state::AuthState;
use crate::error::Error;
use crate::identity::{IdentityKind, IdentityStore, LocalIdentity};

/// Authenticated identity extracted from the session cookie.
///
/// Use as an Axum extractor in route handlers. Returns an opaque
/// `401 Unauthorized` if anything along the gate fails.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(CurrentIdentity(identity): CurrentIdentity) -> impl IntoResponse {
///     format!("Hello, {}", identity.handle)
/// }
///
/// // Optional: accessible to both authenticated and anonymous callers
/// async fn public(identity: Option<CurrentIdentity>) -> impl IntoResponse {
///     match identity {
///         Some(CurrentIdentity(i)) => format!("Hello, {}", i.handle),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub LocalIdentity);

/// Run the full authentication gate for a request's cookies.
///
/// Stages: cookie present → token verifies (signature + expiry + payload
/// invariants) → local identity still exists → for provider-backed
/// identities, the embedded access token still resolves to the same remote
/// id. Local-kind identities skip the provider call entirely.
///
/// The returned error distinguishes the failing stage for logging; callers
/// at the HTTP boundary must collapse it to one opaque rejection.
pub(super) async fn authenticate<S: IdentityStore>(
    state: &AuthState<S>,
    jar: &CookieJar,
) -> Result<LocalIdentity, Error> {
    let Some(cookie) = jar.get(&state.settings.session_cookie_name) else {
        tracing::debug!("no session cookie on request");
        return Err(Error::InvalidToken);
    };

    let claims = state.signer.verify(cookie.value())?;

    let identity = state
        .store
        .find_by_id(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "identity store lookup failed");
            Error::IdentityNotFound
        })?
        .ok_or(Error::IdentityNotFound)?;

    match identity.kind {
        IdentityKind::Local => Ok(identity),
        IdentityKind::Provider => {
            // verify() enforces presence, but the gate must not admit a
            // provider session without re-checking the provider.
            let access_token = claims.access_token.ok_or(Error::InvalidToken)?;

            let remote = state
                .client
                .fetch_identity(&access_token)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "provider re-validation call failed");
                    Error::Revalidation
                })?;

            if remote.id != identity.id {
                tracing::warn!(
                    local_id = %identity.id,
                    remote_id = %remote.id,
                    "provider identity mismatch during re-validation"
                );
                return Err(Error::Revalidation);
            }

            Ok(identity)
        }
    }
}

impl<S: IdentityStore> FromRequestParts<AuthState<S>> for CurrentIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<S>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        match authenticate(state, &jar).await {
            Ok(identity) => Ok(Self(identity)),
            Err(e) => {
                tracing::debug!(error = %e, "authentication rejected");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}
