use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{self, protected, public};
use crate::middleware::{correlation_id_middleware, session_middleware, CORRELATION_HEADER, SESSION_TOKEN_HEADER};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .merge(auth_public_routes())
        .merge(auth_routes())
        .merge(profile_routes())
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware));

    let router = match cors_layer(&state.config.security) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/oauth/:provider", get(auth::oauth_start))
        .route("/auth/oauth/:provider/callback", get(auth::oauth_callback))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route(
            "/api/auth/session",
            get(auth::session_get).patch(auth::session_patch),
        )
        .route("/api/auth/logout", post(auth::session_logout))
}

fn profile_routes() -> Router<AppState> {
    use protected::profile;

    Router::new()
        .route("/api/profile", get(profile::profile_get))
        .route("/api/profile/name", put(profile::profile_name_put))
        .route("/api/profile/image", put(profile::profile_image_put))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let correlation = HeaderName::from_static(CORRELATION_HEADER);
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, correlation.clone()])
            .expose_headers([correlation, HeaderName::from_static(SESSION_TOKEN_HEADER)])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
