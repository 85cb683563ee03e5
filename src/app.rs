use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::StorageConfig;
use crate::state::AppState;
use crate::{admin, auth, recipes};

pub fn build_app(state: AppState) -> Router {
    let mut app = Router::new().nest(
        "/api",
        Router::new()
            .merge(auth::router())
            .merge(admin::router())
            .merge(recipes::router(state.config.max_upload_bytes))
            .route("/health", get(|| async { "ok" })),
    );

    // local uploads are served by the app itself
    if let StorageConfig::Local {
        media_root,
        media_url,
    } = &state.config.storage
    {
        let prefix = format!("/{}", media_url.trim_matches('/'));
        if prefix != "/" && !media_url.contains("://") {
            app = app.nest_service(&prefix, ServeDir::new(media_root));
        }
    }

    app.with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn private_endpoints_require_a_token() {
        let app = build_app(AppState::fake());
        let cases = [
            (Method::GET, "/api/user/me"),
            (Method::PATCH, "/api/user/me"),
            (Method::GET, "/api/recipe/tags"),
            (Method::POST, "/api/recipe/tags"),
            (Method::GET, "/api/recipe/ingredients"),
            (Method::GET, "/api/recipe/recipes"),
            (Method::POST, "/api/recipe/recipes"),
            (Method::GET, "/api/recipe/recipes/1"),
            (Method::PUT, "/api/recipe/recipes/1"),
            (Method::DELETE, "/api/recipe/recipes/1"),
            (Method::POST, "/api/recipe/recipes/1/upload-image"),
            (Method::GET, "/api/admin/users"),
            (Method::GET, "/api/admin/users/1"),
        ];
        for (method, uri) in cases {
            let res = app.clone().oneshot(request(method.clone(), uri)).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn malformed_token_header_is_unauthorized() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .uri("/api/recipe/tags")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Invalid token header.");
    }

    #[tokio::test]
    async fn user_creation_validates_before_hitting_the_db() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/user/create")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"test@gmail.com","password":"pw"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("password").is_some());
    }

    #[tokio::test]
    async fn json_type_errors_are_keyed_by_field() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/user/create")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":5,"password":"DataScience2021"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("email").is_some(), "{json}");
        assert!(json.get("non_field_errors").is_none());
    }
}
