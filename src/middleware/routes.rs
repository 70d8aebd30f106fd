use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Json, Router};
use axum::routing::get;
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::Deserialize;

use super::config::{AuthConfig, AuthSettings};
use super::cookies::{self, SessionCookieOpts};
use super::extractor::CurrentIdentity;
use super::state::AuthState;
use crate::identity::{IdentityStore, LocalIdentity};
use crate::pkce::{AuthorizationChallenge, ChallengeMethod};

/// Create the authentication router.
///
/// Mounts `{auth_path}/login`, `{auth_path}/callback`,
/// `{auth_path}/logout` (GET and POST), and `/me`.
pub fn auth_routes<S>(config: AuthConfig, store: S) -> Router
where
    S: IdentityStore,
{
    let auth_path = config.settings.auth_path.clone();

    let state = AuthState {
        client: Arc::new(config.client),
        store: Arc::new(store),
        signer: Arc::new(config.signer),
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<S>))
        .route(&format!("{auth_path}/callback"), get(callback::<S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S>).post(logout::<S>),
        )
        .route("/me", get(me::<S>))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: IdentityStore>(
    State(state): State<AuthState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let challenge = AuthorizationChallenge::generate(ChallengeMethod::S256);
    let url = state.client.config().authorization_url(&challenge);

    let (pkce_cookie, state_cookie) = cookies::pkce_cookies(
        &challenge.code_verifier,
        &challenge.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    (jar.add(pkce_cookie).add(state_cookie), Redirect::to(url.as_str()))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: IdentityStore>(
    State(state): State<AuthState<S>>,
    jar: PrivateCookieJar,
    session_jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, CookieJar, Redirect), Response> {
    // Every failure lands on the same bare redirect: the client learns
    // whether it is authenticated from a later /me call, nothing else.
    let fail = || abort_to_client(&state.settings);

    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("unknown");
        tracing::warn!(error = %error, description = %desc, "provider returned an OAuth2 error");
        return Err(fail());
    }

    let code = params.code.ok_or_else(|| {
        tracing::warn!("callback missing authorization code");
        fail()
    })?;

    let received_state = params.state.ok_or_else(|| {
        tracing::warn!("callback missing state parameter");
        fail()
    })?;

    let stored_state = cookies::get_state(&jar).ok_or_else(|| {
        tracing::warn!("no state cookie bound to this browser");
        fail()
    })?;

    if received_state != stored_state {
        tracing::warn!("OAuth2 state mismatch");
        return Err(fail());
    }

    let code_verifier = cookies::get_pkce_verifier(&jar).ok_or_else(|| {
        tracing::warn!("no PKCE verifier cookie bound to this browser");
        fail()
    })?;

    let token_response = state
        .client
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "token exchange failed");
            fail()
        })?;

    let remote = state
        .client
        .fetch_identity(&token_response.access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "profile fetch failed");
            fail()
        })?;

    let identity = state.store.upsert(&remote).await.map_err(|e| {
        tracing::error!(error = %e, "identity upsert failed");
        fail()
    })?;

    let token = state
        .signer
        .sign(&identity, Some(token_response.access_token))
        .map_err(|e| {
            tracing::error!(error = %e, "session signing failed");
            fail()
        })?;

    let session_cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        &token,
        session_opts(&state.settings),
    );

    let (clear_pkce, clear_state) = cookies::clear_pkce_cookies(&state.settings.auth_path);
    let jar = jar.add(clear_pkce).add(clear_state);

    tracing::info!(id = %identity.id, handle = %identity.handle, "OAuth2 login successful");

    Ok((
        jar,
        session_jar.add(session_cookie),
        Redirect::to(&state.settings.client_origin),
    ))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: IdentityStore>(
    State(state): State<AuthState<S>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let clear = cookies::clear_session_cookie(
        &state.settings.session_cookie_name,
        session_opts(&state.settings),
    );
    (jar.add(clear), Redirect::to(&state.settings.client_origin))
}

// ── Identity check ─────────────────────────────────────────────────

async fn me<S: IdentityStore>(
    CurrentIdentity(identity): CurrentIdentity,
) -> Json<LocalIdentity> {
    Json(identity)
}

// ── Helpers ────────────────────────────────────────────────────────

fn session_opts(settings: &AuthSettings) -> SessionCookieOpts {
    SessionCookieOpts {
        secure: settings.secure_cookies,
        cross_origin: settings.cross_origin,
        persistent: settings.persistent_sessions,
        ttl_seconds: settings.session_ttl_seconds,
    }
}

fn abort_to_client(settings: &AuthSettings) -> Response {
    Redirect::to(&settings.client_origin).into_response()
}
