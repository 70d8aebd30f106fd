use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::identity::RemoteIdentity;
use crate::pkce::AuthorizationChallenge;

/// Upper bound on any outbound provider call. A hung exchange leaves the
/// browser stranded mid-redirect, so every call fails instead of waiting.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider `OAuth2` configuration.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors. Endpoint defaults target the provider's v2 API; override them for
/// a stub provider in tests.
///
/// ```rust,ignore
/// use sparrow_auth::ProviderConfig;
///
/// let config = ProviderConfig::new("client-id", "client-secret", "https://my-app.com/oauth/callback".parse()?);
/// let config = config.with_scopes(vec!["users.read".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl ProviderConfig {
    /// Create a new provider configuration.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_url: "https://twitter.com/i/oauth2/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://api.twitter.com/2/oauth2/token"
                .parse()
                .expect("valid default URL"),
            userinfo_url: "https://api.twitter.com/2/users/me"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["users.read".into(), "tweet.read".into()],
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token exchange endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the userinfo endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Override the requested `OAuth2` scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `OAuth2` redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested `OAuth2` scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Build the provider authorization URL for a challenge.
    ///
    /// Pure construction: scopes joined by a single space, every parameter
    /// percent-encoded by the `Url` query serializer. The caller must send
    /// the exact `redirect_uri` used here to the token endpoint later.
    #[must_use]
    pub fn authorization_url(&self, challenge: &AuthorizationChallenge) -> Url {
        let scope = self.scopes.join(" ");

        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("state", &challenge.state)
            .append_pair("code_challenge", &challenge.code_challenge)
            .append_pair("code_challenge_method", challenge.method.as_str())
            .append_pair("scope", &scope);
        url
    }
}

/// Token response from the provider token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Envelope the provider wraps userinfo responses in.
#[derive(Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    data: Option<RemoteIdentity>,
}

/// `OAuth2` client for the identity provider.
pub struct ProviderClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl ProviderClient {
    /// Create a new provider client with a bounded-timeout HTTP client.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("default TLS backend available");
        Self { config, http }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Exchange an authorization code for an access token.
    ///
    /// One POST, authenticated with HTTP Basic from
    /// `base64(client_id:client_secret)`, form-encoded body. `redirect_uri`
    /// must byte-for-byte match the authorization request or the provider
    /// rejects the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure, or [`Error::Exchange`]
    /// on a non-2xx status or malformed body. Callers treat any error as
    /// "authorization failed" — provider detail never reaches the browser.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, exchange_error).await?;
        let status = response.status().as_u16();
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| exchange_error(Some(status), format!("malformed body: {e}")))
    }

    /// Fetch the canonical remote profile for an access token.
    ///
    /// One authenticated GET; idempotent and side-effect free on the
    /// provider, so the gate can call it on every request to detect
    /// revocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure, or [`Error::Profile`]
    /// when the token is expired/revoked or the body is unusable.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<RemoteIdentity, Error> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, profile_error).await?;
        let status = response.status().as_u16();
        let envelope = response
            .json::<UserEnvelope>()
            .await
            .map_err(|e| profile_error(Some(status), format!("malformed body: {e}")))?;

        envelope
            .data
            .ok_or_else(|| profile_error(Some(status), "missing data object".into()))
    }

    /// Checks HTTP response status; returns the response on success or the
    /// operation's error with status and body detail.
    async fn ensure_success(
        response: reqwest::Response,
        make_error: fn(Option<u16>, String) -> Error,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(make_error(Some(status), body))
    }
}

fn exchange_error(status: Option<u16>, detail: String) -> Error {
    Error::Exchange { status, detail }
}

fn profile_error(status: Option<u16>, detail: String) -> Error {
    Error::Profile { status, detail }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::pkce::{AuthorizationChallenge, ChallengeMethod};

    use super::*;

    fn test_config() -> ProviderConfig {
        ProviderConfig::new(
            "test-client",
            "test-secret",
            "https://example.com/oauth/callback".parse().unwrap(),
        )
    }

    #[test]
    fn authorization_url_contains_all_parameters() {
        let challenge = AuthorizationChallenge::generate(ChallengeMethod::S256);
        let url = test_config().authorization_url(&challenge);

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("response_type").unwrap(), "code");
        assert_eq!(params.get("client_id").unwrap(), "test-client");
        assert_eq!(
            params.get("redirect_uri").unwrap(),
            "https://example.com/oauth/callback"
        );
        assert_eq!(params.get("state").unwrap(), &challenge.state);
        assert_eq!(
            params.get("code_challenge").unwrap(),
            &challenge.code_challenge
        );
        assert_eq!(params.get("code_challenge_method").unwrap(), "S256");
    }

    #[test]
    fn authorization_url_joins_scopes_with_single_space() {
        let challenge = AuthorizationChallenge::generate(ChallengeMethod::S256);
        let config = test_config().with_scopes(vec!["users.read".into(), "tweet.read".into()]);
        let url = config.authorization_url(&challenge);

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("scope").unwrap(), "users.read tweet.read");
        // single space percent-encodes to one +/%20 in the serialized query
        assert!(url.as_str().contains("scope=users.read+tweet.read"));
    }

    #[test]
    fn authorization_url_unique_per_challenge() {
        let config = test_config();
        let url1 = config.authorization_url(&AuthorizationChallenge::generate(
            ChallengeMethod::S256,
        ));
        let url2 = config.authorization_url(&AuthorizationChallenge::generate(
            ChallengeMethod::S256,
        ));
        assert_ne!(url1, url2);
    }

    #[test]
    fn config_constructor_and_overrides() {
        let config = test_config()
            .with_auth_url("https://stub.example.com/authorize".parse().unwrap())
            .with_scopes(vec!["users.read".into()]);

        assert_eq!(config.client_id(), "test-client");
        assert_eq!(
            config.redirect_uri().as_str(),
            "https://example.com/oauth/callback"
        );
        assert_eq!(config.auth_url.as_str(), "https://stub.example.com/authorize");
        assert_eq!(config.scopes(), &["users.read"]);
    }

    #[test]
    fn plain_method_challenge_appears_verbatim() {
        let challenge = AuthorizationChallenge::generate(ChallengeMethod::Plain);
        let url = test_config().authorization_url(&challenge);

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("code_challenge").unwrap(), &challenge.code_verifier);
        assert_eq!(params.get("code_challenge_method").unwrap(), "plain");
    }
}
