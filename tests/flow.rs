//! End-to-end authorization flow against a stub provider.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, header as header_match, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sparrow_auth::{
    AuthConfig, IdentityId, IdentityKind, LocalIdentity, MemoryIdentityStore, ProviderClient,
    ProviderConfig, SessionSigner, auth_routes,
};

const SESSION_SECRET: &str = "integration-test-secret-0123456789abcdef";
const CLIENT_ORIGIN: &str = "http://client.test";

struct TestApp {
    app: Router,
    store: Arc<MemoryIdentityStore>,
    signer: SessionSigner,
}

fn test_app(provider: &MockServer) -> TestApp {
    let provider_config = ProviderConfig::new(
        "client-1",
        "sekrit",
        "http://app.test/oauth/callback".parse().unwrap(),
    )
    .with_token_url(format!("{}/2/oauth2/token", provider.uri()).parse().unwrap())
    .with_userinfo_url(format!("{}/2/users/me", provider.uri()).parse().unwrap());

    let signer = SessionSigner::new(SESSION_SECRET, 7200);
    let store = Arc::new(MemoryIdentityStore::new());

    let config = AuthConfig::new(
        ProviderClient::new(provider_config),
        signer.clone(),
        CLIENT_ORIGIN,
    )
    .with_secure_cookies(false);

    TestApp {
        app: auth_routes(config, store.clone()),
        store,
        signer,
    }
}

async fn get(app: &Router, uri: &str, cookies: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .expect("request should complete")
}

/// All `name=value` pairs set by the response, joined for a Cookie header.
fn cookie_header(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            v.to_str()
                .expect("set-cookie should be ASCII")
                .split(';')
                .next()
                .unwrap()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Value of one set cookie, if the response sets it.
fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Drive login → callback for a code, returning the signed session token.
async fn login_and_callback(app: &Router, code: &str) -> Option<String> {
    let login = get(app, "/oauth/login", None).await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);

    let location = login.headers()[header::LOCATION].to_str().unwrap();
    let auth_url = Url::parse(location).expect("authorization URL should parse");
    let state = auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization URL should carry state");

    let cookies = cookie_header(&login);
    let callback = get(
        app,
        &format!("/oauth/callback?code={code}&state={state}"),
        Some(&cookies),
    )
    .await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        callback.headers()[header::LOCATION].to_str().unwrap(),
        CLIENT_ORIGIN
    );

    set_cookie_value(&callback, "oauth2_token").filter(|v| !v.is_empty())
}

fn mount_token_exchange(code: &str, access_token: &str) -> Mock {
    let basic = STANDARD.encode("client-1:sekrit");
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .and(header_match("authorization", format!("Basic {basic}").as_str()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 7200,
            "scope": "users.read tweet.read",
        })))
}

fn mount_userinfo(access_token: &str, id: &str, name: &str, username: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .and(header_match(
            "authorization",
            format!("Bearer {access_token}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": id, "name": name, "username": username },
        })))
}

#[tokio::test]
async fn full_flow_issues_verifiable_session() {
    let provider = MockServer::start().await;
    mount_token_exchange("c1", "tok-a").mount(&provider).await;
    mount_userinfo("tok-a", "42", "Ada", "ada").mount(&provider).await;

    let test = test_app(&provider);
    let token = login_and_callback(&test.app, "c1")
        .await
        .expect("callback should set a session cookie");

    let claims = test.signer.verify(&token).expect("issued token should verify");
    assert_eq!(claims.sub.as_str(), "42");
    assert_eq!(claims.access_token.as_deref(), Some("tok-a"));

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={token}"))).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(
        body_json(me).await,
        json!({
            "id": "42",
            "displayName": "Ada",
            "handle": "ada",
            "identityType": "provider",
        })
    );
}

#[tokio::test]
async fn repeat_login_converges_on_same_identity() {
    let provider = MockServer::start().await;
    mount_token_exchange("c1", "tok-a").mount(&provider).await;
    mount_token_exchange("c2", "tok-b").mount(&provider).await;
    mount_userinfo("tok-a", "42", "Ada", "ada").mount(&provider).await;
    mount_userinfo("tok-b", "42", "Ada L.", "ada_l").mount(&provider).await;

    let test = test_app(&provider);
    let first = login_and_callback(&test.app, "c1").await.unwrap();
    let second = login_and_callback(&test.app, "c2").await.unwrap();

    let first_claims = test.signer.verify(&first).unwrap();
    let second_claims = test.signer.verify(&second).unwrap();
    assert_eq!(first_claims.sub, second_claims.sub);

    // attributes refreshed, id unchanged
    let me = get(&test.app, "/me", Some(&format!("oauth2_token={second}"))).await;
    let body = body_json(me).await;
    assert_eq!(body["id"], "42");
    assert_eq!(body["displayName"], "Ada L.");
    assert_eq!(body["handle"], "ada_l");
}

#[tokio::test]
async fn failed_exchange_redirects_without_cookie() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
        })))
        .mount(&provider)
        .await;

    let test = test_app(&provider);
    let login = get(&test.app, "/oauth/login", None).await;
    let location = login.headers()[header::LOCATION].to_str().unwrap();
    let state = Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let cookies = cookie_header(&login);

    let callback = get(
        &test.app,
        &format!("/oauth/callback?code=bad&state={state}"),
        Some(&cookies),
    )
    .await;

    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        callback.headers()[header::LOCATION].to_str().unwrap(),
        CLIENT_ORIGIN
    );
    assert!(
        callback.headers().get(header::SET_COOKIE).is_none(),
        "failed authorization must not set any cookie"
    );

    // and the browser, still cookieless, is not authenticated
    let me = get(&test.app, "/me", None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(me).await, json!("Not Authenticated"));
}

#[tokio::test]
async fn callback_rejects_state_mismatch() {
    let provider = MockServer::start().await;
    // exchange must never be attempted
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider)
        .await;

    let test = test_app(&provider);
    let login = get(&test.app, "/oauth/login", None).await;
    let cookies = cookie_header(&login);

    let callback = get(
        &test.app,
        "/oauth/callback?code=c1&state=forged-state",
        Some(&cookies),
    )
    .await;

    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert!(callback.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn callback_without_bound_cookies_is_rejected() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider)
        .await;

    let test = test_app(&provider);
    let callback = get(&test.app, "/oauth/callback?code=c1&state=whatever", None).await;

    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert!(callback.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn provider_error_param_aborts_flow() {
    let provider = MockServer::start().await;
    let test = test_app(&provider);

    let callback = get(
        &test.app,
        "/oauth/callback?error=access_denied&error_description=user+cancelled",
        None,
    )
    .await;

    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        callback.headers()[header::LOCATION].to_str().unwrap(),
        CLIENT_ORIGIN
    );
    assert!(callback.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn gate_rejects_missing_and_malformed_cookies() {
    let provider = MockServer::start().await;
    let test = test_app(&provider);

    let me = get(&test.app, "/me", None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let me = get(&test.app, "/me", Some("oauth2_token=garbage")).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    // valid token, one byte flipped
    let identity = LocalIdentity {
        id: "42".into(),
        display_name: "Ada".into(),
        handle: "ada".into(),
        kind: IdentityKind::Provider,
    };
    test.store.insert(identity.clone());
    let token = test.signer.sign(&identity, Some("tok-a".into())).unwrap();
    let mut tampered = token.into_bytes();
    let last = tampered.last_mut().unwrap();
    *last = if *last == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={tampered}"))).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_rejects_deleted_identity() {
    let provider = MockServer::start().await;
    mount_token_exchange("c1", "tok-a").mount(&provider).await;
    mount_userinfo("tok-a", "42", "Ada", "ada").mount(&provider).await;

    let test = test_app(&provider);
    let token = login_and_callback(&test.app, "c1").await.unwrap();

    test.store.remove(&IdentityId::from("42"));

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={token}"))).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(me).await, json!("Not Authenticated"));
}

#[tokio::test]
async fn gate_rejects_revoked_provider_token() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized",
        })))
        .mount(&provider)
        .await;

    let test = test_app(&provider);
    let identity = LocalIdentity {
        id: "42".into(),
        display_name: "Ada".into(),
        handle: "ada".into(),
        kind: IdentityKind::Provider,
    };
    test.store.insert(identity.clone());
    let token = test.signer.sign(&identity, Some("tok-revoked".into())).unwrap();

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={token}"))).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_rejects_remote_id_mismatch() {
    let provider = MockServer::start().await;
    // token still resolves, but to a different account
    mount_userinfo("tok-a", "43", "Eve", "eve").mount(&provider).await;

    let test = test_app(&provider);
    let identity = LocalIdentity {
        id: "42".into(),
        display_name: "Ada".into(),
        handle: "ada".into(),
        kind: IdentityKind::Provider,
    };
    test.store.insert(identity.clone());
    let token = test.signer.sign(&identity, Some("tok-a".into())).unwrap();

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={token}"))).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn local_identity_skips_provider_check() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider)
        .await;

    let test = test_app(&provider);
    let identity = LocalIdentity {
        id: "local-1".into(),
        display_name: "Root".into(),
        handle: "root".into(),
        kind: IdentityKind::Local,
    };
    test.store.insert(identity.clone());
    let token = test.signer.sign(&identity, None).unwrap();

    let me = get(&test.app, "/me", Some(&format!("oauth2_token={token}"))).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(
        body_json(me).await,
        json!({
            "id": "local-1",
            "displayName": "Root",
            "handle": "root",
            "identityType": "local",
        })
    );

    // MockServer::verify on drop asserts the expect(0) above: no provider
    // call was made for a local-kind identity.
}

#[tokio::test]
async fn logout_clears_session_cookie() {
    let provider = MockServer::start().await;
    let test = test_app(&provider);

    let logout = get(&test.app, "/oauth/logout", Some("oauth2_token=tok")).await;
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        logout.headers()[header::LOCATION].to_str().unwrap(),
        CLIENT_ORIGIN
    );

    let cleared = logout.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("oauth2_token="));
    assert!(cleared.contains("Max-Age=0"));
    assert!(cleared.contains("Path=/"));
    assert!(cleared.contains("HttpOnly"));
}
