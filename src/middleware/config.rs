use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::oauth::{ProviderClient, ProviderConfig};
use crate::session::SessionSigner;

/// Session tokens and cookies default to the provider access-token lifetime.
const DEFAULT_SESSION_TTL_SECONDS: u64 = 7200;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_seconds: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) cross_origin: bool,
    pub(crate) persistent_sessions: bool,
    pub(crate) auth_path: String,
    pub(crate) client_origin: String,
}

impl AuthSettings {
    fn defaults(client_origin: String, session_ttl_seconds: i64) -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "oauth2_token".into(),
            session_ttl_seconds,
            secure_cookies: true,
            cross_origin: false,
            persistent_sessions: true,
            auth_path: "/oauth".into(),
            client_origin,
        }
    }
}

/// Authentication configuration.
///
/// Required pieces (`client`, `signer`, `client_origin`) are constructor
/// parameters — no runtime "missing field" errors. Use
/// [`from_env()`](AuthConfig::from_env) for convention-based setup, or
/// [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(super) client: ProviderClient,
    pub(super) signer: SessionSigner,
    pub(super) settings: AuthSettings,
}

impl AuthConfig {
    /// Create config from the required parts.
    ///
    /// `client_origin` is where every callback ends up, success or failure.
    #[must_use]
    pub fn new(
        client: ProviderClient,
        signer: SessionSigner,
        client_origin: impl Into<String>,
    ) -> Self {
        let ttl = signer.ttl_seconds() as i64;
        Self {
            client,
            signer,
            settings: AuthSettings::defaults(client_origin.into(), ttl),
        }
    }

    /// Create config from environment variables, failing fast on anything
    /// missing or malformed.
    ///
    /// # Required env vars
    /// - `OAUTH_CLIENT_ID`: provider client ID
    /// - `OAUTH_CLIENT_SECRET`: provider client secret
    /// - `OAUTH_REDIRECT_URI`: callback URI registered with the provider
    /// - `SESSION_SECRET`: session-signing secret, at least 32 bytes
    /// - `CLIENT_ORIGIN`: browser origin to redirect back to
    ///
    /// # Optional env vars
    /// - `OAUTH_AUTH_URL` / `OAUTH_TOKEN_URL` / `OAUTH_USERINFO_URL`:
    ///   endpoint overrides
    /// - `OAUTH_SCOPES`: comma-separated scope list
    /// - `SESSION_COOKIE_NAME`: cookie name (default `oauth2_token`)
    /// - `SESSION_TTL_SECONDS`: token + cookie lifetime (default 7200)
    /// - `COOKIE_KEY`: PKCE-cookie encryption key bytes (default: ephemeral)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] naming the offending variable.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = require_env("OAUTH_CLIENT_ID")?;
        let client_secret = require_env("OAUTH_CLIENT_SECRET")?;
        let redirect_uri: Url = require_env("OAUTH_REDIRECT_URI")?
            .parse()
            .map_err(|e| AuthError::Config(format!("OAUTH_REDIRECT_URI: {e}")))?;
        let session_secret = require_env("SESSION_SECRET")?;
        if session_secret.len() < 32 {
            return Err(AuthError::Config(
                "SESSION_SECRET must be at least 32 bytes".into(),
            ));
        }
        let client_origin = require_env("CLIENT_ORIGIN")?;

        let mut provider = ProviderConfig::new(client_id, client_secret, redirect_uri);

        if let Ok(url_str) = std::env::var("OAUTH_AUTH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("OAUTH_AUTH_URL: {e}")))?;
            provider = provider.with_auth_url(url);
        }
        if let Ok(url_str) = std::env::var("OAUTH_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("OAUTH_TOKEN_URL: {e}")))?;
            provider = provider.with_token_url(url);
        }
        if let Ok(url_str) = std::env::var("OAUTH_USERINFO_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("OAUTH_USERINFO_URL: {e}")))?;
            provider = provider.with_userinfo_url(url);
        }
        if let Ok(scopes) = std::env::var("OAUTH_SCOPES") {
            provider =
                provider.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let ttl_seconds = match std::env::var("SESSION_TTL_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| AuthError::Config(format!("SESSION_TTL_SECONDS: {e}")))?,
            Err(_) => DEFAULT_SESSION_TTL_SECONDS,
        };

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        let signer = SessionSigner::new(session_secret, ttl_seconds);
        let mut config = Self::new(ProviderClient::new(provider), signer, client_origin)
            .with_cookie_key(cookie_key);

        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            config = config.with_session_cookie_name(name);
        }

        Ok(config)
    }

    /// Key encrypting the PKCE/state round-trip cookies. Ephemeral by
    /// default; set one explicitly when running more than one process.
    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Client origin on a different site than this server: switches the
    /// session cookie from `SameSite=Strict` to `SameSite=None`.
    #[must_use]
    pub fn with_cross_origin(mut self, cross_origin: bool) -> Self {
        self.settings.cross_origin = cross_origin;
        self
    }

    /// `false` issues a session-lifetime cookie instead of `Max-Age`.
    #[must_use]
    pub fn with_persistent_sessions(mut self, persistent: bool) -> Self {
        self.settings.persistent_sessions = persistent;
        self
    }

    /// Route prefix for login/callback/logout (default `/oauth`).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }
}

fn require_env(name: &'static str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::Config(format!("{name} is required")))
}
