mod common;

use anyhow::Result;
use auth_template_api::auth::{decode_token, encode_token};
use auth_template_api::config::{AppConfig, SessionStrategy};
use auth_template_api::middleware::SESSION_TOKEN_HEADER;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

/// Re-sign a token as if it had been issued two days ago
fn aged(server: &common::TestServer, token: &str) -> Result<String> {
    let secret = &server.config.security.jwt_secret;
    let mut claims = decode_token(token, secret)?;
    claims.iat -= 2 * 24 * 3600;
    Ok(encode_token(&claims, secret)?)
}

fn cookie_header(server: &common::TestServer, token: &str) -> String {
    format!("{}={}", server.config.security.cookie_name, token)
}

#[tokio::test]
async fn session_requires_login() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;

    let res = client.get(server.url("/api/auth/session")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "You must be logged in");

    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cookie_session_round_trip() -> Result<()> {
    let server = common::TestServer::start().await?;
    let browser = server.browser()?;
    let email = server.register(&browser, "Cookie User", "password123").await?;
    server.login(&browser, &email, "password123").await?;

    let res = browser.get(server.url("/api/auth/session")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["email"], email.as_str());
    assert_eq!(body["data"]["user"]["name"], "Cookie User");

    let res = browser.post(server.url("/api/auth/logout")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = browser.get(server.url("/api/auth/session")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn update_without_user_returns_same_token() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let (_, token) = server.signed_in_user(&client).await?;

    let res = client
        .patch(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["token"], token.as_str());

    let res = client
        .patch(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["token"], token.as_str());
    Ok(())
}

#[tokio::test]
async fn update_merges_profile_fields_but_not_role() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let (_, token) = server.signed_in_user(&client).await?;

    let res = client
        .patch(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .json(&json!({ "user": { "name": "Renamed", "role": "ADMIN" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let new_token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert_ne!(new_token, token);
    assert_eq!(body["data"]["session"]["user"]["name"], "Renamed");
    assert_eq!(body["data"]["session"]["user"]["role"], "USER");

    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&new_token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["name"], "Renamed");
    Ok(())
}

#[tokio::test]
async fn correlation_id_sticks_to_the_session() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let email = server.register(&client, "Traced User", "password123").await?;

    let res = client
        .post(server.url("/auth/login"))
        .header("x-correlation-id", "login-req-1")
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await?;
    let body: Value = res.json().await?;
    let token = body["data"]["token"].as_str().unwrap_or_default();

    let claims = auth_template_api::auth::decode_token(token, &server.config.security.jwt_secret)?;
    assert_eq!(claims.correlation_id, "login-req-1");
    assert_eq!(claims.provider.as_deref(), Some("credentials"));
    Ok(())
}

#[tokio::test]
async fn database_sessions_are_stored_and_revoked() -> Result<()> {
    let mut config = AppConfig::testing();
    config.security.session_strategy = SessionStrategy::Database;
    let server = common::TestServer::start_with(config).await?;
    let client = server.api_client()?;

    let (_, token) = server.signed_in_user(&client).await?;
    assert_eq!(server.store.session_count().await, 1);

    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.store.session_count().await, 0);

    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn aged_bearer_token_is_refreshed_in_header() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let (_, token) = server.signed_in_user(&client).await?;

    // a fresh token is left alone
    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SESSION_TOKEN_HEADER).is_none());

    let old = aged(&server, &token)?;
    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&old)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    let refreshed = res
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("refreshed token header");
    assert_ne!(refreshed, old);

    let old_claims = decode_token(&old, &server.config.security.jwt_secret)?;
    let new_claims = decode_token(&refreshed, &server.config.security.jwt_secret)?;
    assert!(new_claims.iat > old_claims.iat);
    assert!(new_claims.exp >= old_claims.exp);
    assert_eq!(new_claims.sub, old_claims.sub);
    assert_eq!(new_claims.correlation_id, old_claims.correlation_id);

    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth(&refreshed)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SESSION_TOKEN_HEADER).is_none());
    Ok(())
}

#[tokio::test]
async fn aged_cookie_is_replaced() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let (_, token) = server.signed_in_user(&client).await?;
    let old = aged(&server, &token)?;

    let res = client
        .get(server.url("/api/auth/session"))
        .header(header::COOKIE, cookie_header(&server, &old))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SESSION_TOKEN_HEADER).is_none());
    let cookie = common::set_cookie_value(&res, &server.config.security.cookie_name)
        .expect("refreshed session cookie");
    let value = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap_or_default();
    assert!(!value.is_empty());
    assert_ne!(value, old);
    assert!(cookie.contains("HttpOnly"));
    decode_token(&value, &server.config.security.jwt_secret)?;
    Ok(())
}

#[tokio::test]
async fn invalid_cookie_is_cleared() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;

    let res = client
        .get(server.url("/api/auth/session"))
        .header(header::COOKIE, cookie_header(&server, "not-a-token"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let cookie = common::set_cookie_value(&res, &server.config.security.cookie_name)
        .expect("removal cookie");
    assert!(cookie.starts_with(&format!("{}=;", server.config.security.cookie_name)));
    assert!(cookie.contains("Max-Age=0"));

    // a bad bearer token has no cookie to clear
    let res = client
        .get(server.url("/api/auth/session"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn handler_cookie_wins_over_refresh() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = server.api_client()?;
    let (_, token) = server.signed_in_user(&client).await?;
    let old = aged(&server, &token)?;

    let res = client
        .patch(server.url("/api/auth/session"))
        .header(header::COOKIE, cookie_header(&server, &old))
        .json(&json!({ "user": { "name": "Renamed Again" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get_all(header::SET_COOKIE).iter().count(), 1);
    let cookie = common::set_cookie_value(&res, &server.config.security.cookie_name)
        .expect("session cookie");
    let body: Value = res.json().await?;
    let issued = body["data"]["token"].as_str().unwrap_or_default();
    assert!(cookie.starts_with(&cookie_header(&server, issued)));

    let claims = decode_token(issued, &server.config.security.jwt_secret)?;
    assert_eq!(claims.name.as_deref(), Some("Renamed Again"));
    Ok(())
}
