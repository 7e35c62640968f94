mod common;

use anyhow::Result;
use auth_template_api::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn register_then_login() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "  Ada Lovelace ", "email": "Ada@Example.com", "password": "analytical" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Ada Lovelace");
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert_eq!(body["data"]["role"], "USER");
    assert!(body["data"].get("password_hash").is_none());

    let body = server.login(&client, "ADA@example.com", "analytical").await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["session"]["user"]["email"], "ada@example.com");
    assert_eq!(body["data"]["session"]["user"]["role"], "USER");
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let email = server.register(&client, "First User", "password123").await?;

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Second User", "email": email, "password": "password456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(server.store.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn registration_validates_input() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Al", "email": "al@example.com", "password": "password123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Name must be at least 3 characters");

    let res = client
        .post(server.url("/auth/register"))
        .body("not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let email = server.register(&client, "Test User", "password123").await?;

    for (email, password) in [(email.as_str(), "wrong-password"), ("nobody@example.com", "password123")] {
        let res = client
            .post(server.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await?;
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Invalid email or password");
    }
    Ok(())
}

#[tokio::test]
async fn registration_can_be_disabled() -> Result<()> {
    let mut config = AppConfig::testing();
    config.auth.allow_registration = false;
    let server = common::TestServer::start_with(config).await?;

    let res = server
        .api_client()?
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Blocked", "email": "b@example.com", "password": "password123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.store.user_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_oauth_provider_is_not_found() -> Result<()> {
    let server = common::TestServer::start().await?;
    let res = server
        .api_client()?
        .get(server.url("/auth/oauth/github"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn oauth_start_redirects_and_callback_checks_state() -> Result<()> {
    let mut config = AppConfig::testing();
    config.auth.google = Some(auth_template_api::config::OAuthClientConfig {
        client_id: "test-client".into(),
        client_secret: "test-secret".into(),
        redirect_url: "http://127.0.0.1/auth/oauth/google/callback".into(),
    });
    let server = common::TestServer::start_with(config).await?;
    let client = server.api_client()?;

    let res = client.get(server.url("/auth/oauth/google")).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let location = res
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("client_id=test-client"));

    // forged state never reaches the provider
    let res = client
        .get(server.url("/auth/oauth/google/callback?code=abc&state=forged"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn oauth_callback_signs_in_and_links_account() -> Result<()> {
    use auth_template_api::database::AuthAdapter;

    let mock = common::MockProvider::start().await?;
    let server = common::TestServer::start_with_providers(AppConfig::testing(), vec![mock.google()?]).await?;
    let browser = server.browser()?;

    let res = browser.get(server.url("/auth/oauth/google")).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let state = common::redirect_state(&res)?;

    let res = browser
        .get(server.url("/auth/oauth/google/callback"))
        .query(&[("code", common::MOCK_CODE), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(common::set_cookie_value(&res, &server.config.security.cookie_name).is_some());
    let body: Value = res.json().await?;
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["session"]["user"]["email"], "grace@navy.mil");
    assert_eq!(body["data"]["session"]["user"]["name"], "Grace Hopper");
    assert_eq!(body["data"]["session"]["user"]["image"], "https://example.com/grace.png");
    assert_eq!(body["data"]["session"]["user"]["role"], "USER");

    let user = server
        .store
        .get_user_by_account("google", "g-42")
        .await?
        .expect("account should be linked");
    assert_eq!(user.email.as_deref(), Some("grace@navy.mil"));
    assert!(user.email_verified.is_some());
    assert_eq!(server.store.user_count().await, 1);

    // the cookie set by the callback is a working session
    let res = browser.get(server.url("/api/auth/session")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["id"], user.id.to_string());

    // the state was consumed
    let res = browser
        .get(server.url("/auth/oauth/google/callback"))
        .query(&[("code", common::MOCK_CODE), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // signing in again reuses the linked user
    let res = browser.get(server.url("/auth/oauth/google")).send().await?;
    let state = common::redirect_state(&res)?;
    let res = browser
        .get(server.url("/auth/oauth/google/callback"))
        .query(&[("code", common::MOCK_CODE), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.store.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn oauth_provider_failures_are_reported() -> Result<()> {
    let mock = common::MockProvider::start().await?;
    let server = common::TestServer::start_with_providers(AppConfig::testing(), vec![mock.google()?]).await?;
    let client = server.api_client()?;

    // rejected code surfaces as a gateway error
    let res = client.get(server.url("/auth/oauth/google")).send().await?;
    let state = common::redirect_state(&res)?;
    let res = client
        .get(server.url("/auth/oauth/google/callback"))
        .query(&[("code", "bad-code"), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], true);

    // the user declined at the provider
    let res = client.get(server.url("/auth/oauth/google")).send().await?;
    let state = common::redirect_state(&res)?;
    let res = client
        .get(server.url("/auth/oauth/google/callback"))
        .query(&[("error", "access_denied"), ("state", state.as_str())])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(server.store.user_count().await, 0);
    Ok(())
}
