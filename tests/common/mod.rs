#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use auth_template_api::auth::OAuthProvider;
use auth_template_api::config::AppConfig;
use auth_template_api::database::MemoryAdapter;
use auth_template_api::{app, AppState};
use axum::extract::Form;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

/// An in-process server on its own port, backed by an in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryAdapter>,
    pub config: AppConfig,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(AppConfig::testing()).await
    }

    pub async fn start_with(config: AppConfig) -> Result<Self> {
        Self::start_with_providers(config, Vec::new()).await
    }

    /// Start with extra OAuth providers registered next to the configured ones
    pub async fn start_with_providers(config: AppConfig, providers: Vec<OAuthProvider>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryAdapter::new());
        let mut state = AppState::with_adapter(config.clone(), store.clone());
        if !providers.is_empty() {
            let mut registry = (*state.oauth).clone();
            for provider in providers {
                registry.register(provider);
            }
            state.oauth = Arc::new(registry);
        }

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            store,
            config,
            handle,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Client that keeps cookies between requests, like a browser
    pub fn browser(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build client")
    }

    /// Client without cookies; sessions travel as bearer tokens
    pub fn api_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build client")
    }

    /// Register a credentials user and return its email
    pub async fn register(&self, client: &reqwest::Client, name: &str, password: &str) -> Result<String> {
        let email = format!("user_{}@example.com", Uuid::new_v4().simple());
        let resp = client
            .post(self.url("/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::CREATED, "register returned {}", resp.status());
        Ok(email)
    }

    /// Sign in and return the login response body
    pub async fn login(&self, client: &reqwest::Client, email: &str, password: &str) -> Result<Value> {
        let resp = client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "login returned {}", resp.status());
        Ok(resp.json().await?)
    }

    /// Register plus sign in; returns (email, bearer token)
    pub async fn signed_in_user(&self, client: &reqwest::Client) -> Result<(String, String)> {
        let email = self.register(client, "Test User", "password123").await?;
        let body = self.login(client, &email, "password123").await?;
        let token = body["data"]["token"]
            .as_str()
            .context("login response has no token")?
            .to_string();
        Ok((email, token))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub const MOCK_CODE: &str = "good-code";
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Stand-in for an OAuth provider's token and userinfo endpoints
pub struct MockProvider {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

async fn mock_token(Form(params): Form<std::collections::HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let valid = params.get("grant_type").map(String::as_str) == Some("authorization_code")
        && params.get("code").map(String::as_str) == Some(MOCK_CODE)
        && params.get("client_secret").map(String::as_str) == Some("mock-secret");
    if !valid {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": MOCK_ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "openid email profile"
        })),
    )
}

async fn mock_userinfo(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", MOCK_ACCESS_TOKEN);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_token" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "sub": "g-42",
            "email": "Grace@Navy.mil",
            "email_verified": true,
            "name": "Grace Hopper",
            "picture": "https://example.com/grace.png"
        })),
    )
}

impl MockProvider {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        let router = Router::new()
            .route("/token", post(mock_token))
            .route("/userinfo", get(mock_userinfo));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        })
    }

    /// A "google" provider whose back-channel endpoints point at this mock
    pub fn google(&self) -> Result<OAuthProvider> {
        let mut provider = OAuthProvider::google(&auth_template_api::config::OAuthClientConfig {
            client_id: "mock-client".into(),
            client_secret: "mock-secret".into(),
            redirect_url: "http://127.0.0.1/auth/oauth/google/callback".into(),
        })?;
        provider.token_url = format!("{}/token", self.base_url).parse()?;
        provider.userinfo_url = format!("{}/userinfo", self.base_url).parse()?;
        Ok(provider)
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Pull the `state` parameter out of a provider redirect
pub fn redirect_state(response: &reqwest::Response) -> Result<String> {
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .context("redirect has no location")?;
    let url = url::Url::parse(location)?;
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .context("redirect has no state")
}

/// Value of the named cookie in a response's Set-Cookie headers
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| v.to_string())
}
