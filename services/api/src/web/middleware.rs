//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{
    extract::{Query, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

/// Header carrying the caller's user id, set by the upstream account service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Query parameters that may carry the caller's identity.
#[derive(Deserialize, Debug, Default)]
pub struct IdentityQuery {
    pub user_id: Option<String>,
}

/// Middleware that resolves the calling user and inserts their id into request extensions.
///
/// The id comes from the `x-user-id` header, or from a `user_id` query parameter
/// for WebSocket upgrades, where browsers cannot set headers.
/// If missing or malformed, returns 401 Unauthorized.
pub async fn require_user(
    Query(identity): Query<IdentityQuery>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let from_header = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let user_id = from_header
        .or(identity.user_id)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn router() -> Router {
        Router::new()
            .route(
                "/me",
                get(|Extension(user_id): Extension<Uuid>| async move { user_id.to_string() }),
            )
            .layer(middleware::from_fn(require_user))
    }

    #[tokio::test]
    async fn missing_or_malformed_identity_is_rejected() {
        let response = router()
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(USER_ID_HEADER, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn header_or_query_identifies_the_user() {
        let user = Uuid::new_v4();
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(USER_ID_HEADER, user.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router()
            .oneshot(
                Request::builder()
                    .uri(format!("/me?user_id={}", user))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_identity_is_read_among_other_parameters() {
        let user = Uuid::new_v4();
        let response = router()
            .oneshot(
                Request::builder()
                    .uri(format!("/me?tier=easy&user_id={}&user_idx=1", user))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, user.to_string());

        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/me?user_idx=1&user_id=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
