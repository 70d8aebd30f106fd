use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

const PKCE_COOKIE_NAME: &str = "__oauth_pkce";
const STATE_COOKIE_NAME: &str = "__oauth_state";

/// How long the PKCE/state cookies may outlive the redirect to the provider.
const CHALLENGE_TTL: Duration = Duration::minutes(5);

/// Session cookie attributes. `clear_session_cookie` must mirror every field
/// or browsers keep the original cookie alive.
#[derive(Debug, Clone, Copy)]
pub(super) struct SessionCookieOpts {
    pub(super) secure: bool,
    /// Cross-origin deployments need `SameSite=None`; same-origin gets Strict.
    pub(super) cross_origin: bool,
    /// Set `Max-Age` (persistent cookie) rather than a session-lifetime one.
    pub(super) persistent: bool,
    pub(super) ttl_seconds: i64,
}

fn session_same_site(cross_origin: bool) -> SameSite {
    if cross_origin {
        SameSite::None
    } else {
        SameSite::Strict
    }
}

/// Create PKCE verifier + state cookies for the authorization request.
///
/// Lax, not Strict: the callback arrives as a top-level navigation from the
/// provider's origin, and Strict cookies are not sent on it.
pub(super) fn pkce_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
    auth_path: &str,
) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, code_verifier.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(CHALLENGE_TTL)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(CHALLENGE_TTL)
        .build();

    (verifier, state)
}

/// Create removal cookies for PKCE verifier + state, so the challenge is
/// single-use.
pub(super) fn clear_pkce_cookies(auth_path: &str) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    (verifier, state)
}

/// Create the session cookie carrying the signed token.
pub(super) fn session_cookie(
    name: &str,
    token: &str,
    opts: SessionCookieOpts,
) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(opts.secure)
        .same_site(session_same_site(opts.cross_origin))
        .path("/".to_string());
    if opts.persistent {
        builder = builder.max_age(Duration::seconds(opts.ttl_seconds));
    }
    builder.build()
}

/// Create the removal cookie for the session: identical name, path, and
/// attributes with an already-elapsed `Max-Age`.
pub(super) fn clear_session_cookie(name: &str, opts: SessionCookieOpts) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .secure(opts.secure)
        .same_site(session_same_site(opts.cross_origin))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the PKCE verifier from cookies.
pub(super) fn get_pkce_verifier(jar: &axum_extra::extract::PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Get the state from cookies.
pub(super) fn get_state(jar: &axum_extra::extract::PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}
