use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::AppConfig;
use crate::database::{PostRepository, UserRepository};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::{AuthService, CompletionProxy};

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub completions: Arc<CompletionProxy>,
    /// Raised once the users/posts tables are known to exist
    pub schema_ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::new(&config.security)?;
        let hasher = PasswordHasher::new(config.security.password_hash_cost);
        let completions = CompletionProxy::new(config.completion.clone())?;

        Ok(Self {
            auth: Arc::new(AuthService::new(users.clone(), hasher, tokens)),
            users,
            posts,
            completions: Arc::new(completions),
            schema_ready: Arc::new(AtomicBool::new(false)),
        })
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Bearer token required
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{ai, auth, posts};

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/posts", get(posts::posts_get).post(posts::posts_post))
        .route(
            "/api/posts/:id",
            get(posts::post_get)
                .patch(posts::post_patch)
                .delete(posts::post_delete),
        )
        .route("/api/ai/generate", post(ai::generate_post))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Clariox AI Backend Running",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let checked = match state.users.ping().await {
        Ok(()) if !state.schema_ready.load(Ordering::SeqCst) => Err("database schema not ready".to_string()),
        Ok(()) => Ok(()),
        Err(e) => Err(e.to_string()),
    };

    match checked {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(reason) => {
            tracing::warn!("Health check failed: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::TestApp;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    /// Drive one request through the router and decode the JSON body (Null when empty).
    pub(crate) async fn send(
        router: Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn root_reports_service_info() {
        let app = TestApp::new();
        let (status, body) = send(app.router(), Method::GET, "/", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Clariox AI Backend Running");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_reflects_store_reachability() {
        let app = TestApp::new();
        let (status, body) = send(app.router(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");

        app.users.set_unavailable();
        let (status, body) = send(app.router(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["status"], "degraded");
    }

    #[tokio::test]
    async fn health_is_degraded_until_schema_bootstrap_completes() {
        let app = TestApp::new();
        app.state.schema_ready.store(false, Ordering::SeqCst);

        let (status, body) = send(app.router(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["status"], "degraded");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = TestApp::new();
        let (status, _) = send(app.router(), Method::GET, "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let app = TestApp::new();

        for (method, uri) in [
            (Method::GET, "/api/auth/me"),
            (Method::GET, "/api/posts"),
            (Method::GET, "/api/posts/1"),
            (Method::DELETE, "/api/posts/1"),
        ] {
            let (status, body) = send(app.router(), method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["message"], "Could not validate credentials");
        }

        let (status, _) = send(
            app.router(),
            Method::POST,
            "/api/ai/generate",
            None,
            Some(json!({"text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthorized_response_carries_bearer_challenge() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let app = TestApp::new();
        let token = app.register("alice@example.com").await;
        app.users.remove("alice@example.com");

        let (status, body) = send(app.router(), Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    async fn preflight(router: Router, origin: &str) -> Option<String> {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/auth/login")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn cors_allows_only_configured_origins() {
        let app = TestApp::new();

        assert_eq!(
            preflight(app.router(), "http://localhost:3000").await.as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(preflight(app.router(), "http://evil.example").await, None);
    }

    #[tokio::test]
    async fn cors_wildcard_allows_any_origin() {
        let mut config = crate::testing::test_config();
        config.security.cors_origins = vec!["*".to_string()];
        let app = TestApp::with_config(config);

        assert_eq!(preflight(app.router(), "http://evil.example").await.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn invalid_cors_origins_are_skipped() {
        let mut config = crate::testing::test_config();
        config.security.cors_origins = vec!["bad\norigin".to_string(), "http://localhost:5173".to_string()];
        let app = TestApp::with_config(config);

        assert_eq!(
            preflight(app.router(), "http://localhost:5173").await.as_deref(),
            Some("http://localhost:5173")
        );
    }
}
