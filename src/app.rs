use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, cart, catalog, orders, posters};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(catalog::router())
                .merge(cart::router())
                .merge(orders::router())
                .merge(posters::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{jwt::JwtKeys, Role};

    fn token(state: &AppState, role: Role, refresh: bool) -> String {
        let keys = JwtKeys::from(&state.config.jwt);
        let id = Uuid::new_v4();
        if refresh {
            keys.sign_refresh(id, role).unwrap()
        } else {
            keys.sign_access(id, role).unwrap()
        }
    }

    async fn call(
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        json: Option<serde_json::Value>,
    ) -> (StatusCode, String) {
        let state = AppState::fake();
        let app = build_app(state);
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = bearer {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let body = match json {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn customer() -> String {
        token(&AppState::fake(), Role::Customer, false)
    }

    fn admin() -> String {
        token(&AppState::fake(), Role::Admin, false)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = call(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for (method, uri) in [
            (Method::GET, "/api/me"),
            (Method::GET, "/api/cart"),
            (Method::GET, "/api/orders/me"),
            (Method::GET, "/api/custom-posters/me"),
            (Method::GET, "/api/admin/orders"),
        ] {
            let (status, _) = call(method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn garbage_and_refresh_tokens_are_rejected() {
        let (status, _) = call(Method::GET, "/api/me", Some("not.a.jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let refresh = token(&AppState::fake(), Role::Customer, true);
        let (status, body) = call(Method::GET, "/api/me", Some(&refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Access token required");
    }

    #[tokio::test]
    async fn customers_cannot_reach_admin_routes() {
        let t = customer();
        let id = Uuid::new_v4();
        let product = serde_json::json!({
            "name": "Neon Tokyo Night", "category": "Abstract", "price": 1199,
            "images": [], "sizes": [], "frame_types": [], "stock": 3
        });
        let cases = [
            (Method::GET, "/api/admin/orders".to_string(), None),
            (Method::GET, "/api/admin/custom-posters".to_string(), None),
            (Method::POST, "/api/admin/products".to_string(), Some(product)),
            (Method::DELETE, format!("/api/admin/products/{id}"), None),
            (
                Method::PUT,
                format!("/api/admin/orders/{id}/status"),
                Some(serde_json::json!({ "status": "SHIPPED" })),
            ),
        ];
        for (method, uri, json) in cases {
            let (status, _) = call(method, &uri, Some(&t), json).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_status_values_are_unprocessable() {
        let t = admin();
        let id = Uuid::new_v4();
        let (status, _) = call(
            Method::PUT,
            &format!("/api/admin/orders/{id}/status"),
            Some(&t),
            Some(serde_json::json!({ "status": "LOST" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            Method::PUT,
            &format!("/api/admin/custom-posters/{id}/status"),
            Some(&t),
            Some(serde_json::json!({ "status": "Printed" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let (status, body) = call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(serde_json::json!({ "email": "nope", "password": "longenough" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid email");

        let (status, body) = call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(serde_json::json!({ "email": "meera@scenes.in", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Password too short");
    }

    #[tokio::test]
    async fn checkout_rejects_blank_contact() {
        let (status, _) = call(
            Method::POST,
            "/api/orders",
            Some(&customer()),
            Some(serde_json::json!({ "address": "   ", "phone": "+91 98765 43210" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            Method::POST,
            "/api/orders",
            Some(&customer()),
            Some(serde_json::json!({ "address": "12 MG Road, Pune", "phone": "call me" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_order_messages_are_rejected() {
        let id = Uuid::new_v4();
        let (status, _) = call(
            Method::POST,
            &format!("/api/orders/{id}/messages"),
            Some(&customer()),
            Some(serde_json::json!({ "text": "  \n " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cart_rejects_out_of_range_quantity() {
        for quantity in [0, crate::cart::model::MAX_LINE_QUANTITY + 1, i32::MAX] {
            let (status, _) = call(
                Method::POST,
                "/api/cart/items",
                Some(&customer()),
                Some(serde_json::json!({
                    "product_id": Uuid::new_v4(), "quantity": quantity,
                    "size": "12x18", "frame_type": "Classic Black"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
        }
    }

    #[tokio::test]
    async fn poster_requests_need_an_image() {
        let (status, body) = call(
            Method::POST,
            "/api/custom-posters",
            Some(&customer()),
            Some(serde_json::json!({ "custom_text": "Happy anniversary" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "an image is required");

        let (status, _) = call(
            Method::POST,
            "/api/custom-posters",
            Some(&customer()),
            Some(serde_json::json!({ "image_base64": "data:application/pdf;base64,aGk=" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn poster_bodies_above_the_default_limit_reach_validation() {
        // 4 MiB of base64 is well past axum's 2 MB default; the trailing junk makes the
        // request fail in decoding, after the body was accepted.
        let payload = format!("data:image/png;base64,{}!!!!", "A".repeat(4 * 1024 * 1024));
        let (status, body) = call(
            Method::POST,
            "/api/custom-posters",
            Some(&customer()),
            Some(serde_json::json!({ "image_base64": payload })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "image is not valid base64");
    }

    #[tokio::test]
    async fn poster_bodies_above_the_poster_limit_are_refused() {
        let payload = "A".repeat(crate::posters::model::MAX_REQUEST_BYTES + 1024);
        let (status, _) = call(
            Method::POST,
            "/api/custom-posters",
            Some(&customer()),
            Some(serde_json::json!({ "image_base64": payload })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
