pub mod routes;
pub mod state;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use subtle::ConstantTimeEq;
use taskchat_core::config::AppConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Middleware that validates a bearer token from the Authorization header.
///
/// Uses constant-time comparison (`subtle::ConstantTimeEq`) to prevent
/// timing-based side-channel attacks that could leak the token.
async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let expected = match &state.config.server.auth_token {
        Some(t) => t,
        None => return next.run(req).await,
    };

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => {
            let provided = &value[7..];
            // Constant-time comparison: both operands are compared in full,
            // regardless of where they first differ.
            if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
                next.run(req).await
            } else {
                (StatusCode::UNAUTHORIZED, "Invalid or missing bearer token").into_response()
            }
        }
        _ => (StatusCode::UNAUTHORIZED, "Invalid or missing bearer token").into_response(),
    }
}

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    // Protected routes — require auth when a token is configured.
    let protected = Router::new()
        .merge(routes::chat_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Public routes (health) — never require auth.
    let public = Router::new().merge(routes::health_routes());

    let mut app = Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state.clone());

    app = app.layer(TraceLayer::new_for_http());

    if config.server.cors {
        let cors = if config.server.auth_token.is_some() {
            // Restrictive CORS when auth is enabled.
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_origin(Any)
        } else {
            // Permissive CORS for local dev (no auth).
            CorsLayer::permissive()
        };
        app = app.layer(cors);
    }

    app
}

/// Start the HTTP server.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.clone())?;
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    if config.server.auth_token.is_none() {
        tracing::warn!("No auth_token configured — server is unauthenticated!");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router(auth_token: Option<String>) -> Router {
        let mut config = AppConfig::default();
        config.server.auth_token = auth_token;
        let state = AppState::new(config).expect("Failed to create test app state");
        build_router(state)
    }

    fn chat_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat/alice")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_no_auth_required() {
        let app = test_router(Some("secret-token".into()));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_rejects_without_token() {
        let app = test_router(Some("secret-token".into()));
        let resp = app
            .oneshot(chat_request(None, r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_chat_rejects_wrong_token() {
        let app = test_router(Some("secret-token".into()));
        let resp = app
            .oneshot(chat_request(Some("wrong-token"), r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_chat_accepts_correct_token() {
        let app = test_router(Some("secret-token".into()));
        let resp = app
            .oneshot(chat_request(Some("secret-token"), r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_flow_add_and_fetch_messages() {
        let app = test_router(None);

        let resp = app
            .clone()
            .oneshot(chat_request(None, r#"{"message":"add task buy milk"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let reply = body_json(resp).await;
        assert_eq!(reply["conversation_id"], 1);
        assert!(reply["response"]
            .as_str()
            .unwrap()
            .contains("Buy Milk"));
        assert_eq!(reply["tool_calls"][0]["tool_name"], "add_task");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/chat/alice/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let conversations = body_json(resp).await;
        assert_eq!(conversations["count"], 1);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/chat/alice/conversations/1/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let messages = body_json(resp).await;
        assert_eq!(messages["count"], 2);
        assert_eq!(messages["messages"][0]["role"], "user");
        assert_eq!(messages["messages"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_foreign_conversation_is_not_found() {
        let app = test_router(None);

        // Alice creates conversation 1.
        let resp = app
            .clone()
            .oneshot(chat_request(None, r#"{"message":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Bob can't read it...
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/chat/bob/conversations/1/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // ...and can't post into it either.
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat/bob")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"message":"hi","conversation_id":1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
