use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::domain::auth::{AuthUser, Role};
use crate::error::{ErrorEnvelope, ErrorPayload};

/// Trusts the identity asserted upstream (`X-User-Id`, `X-User-Role`); role
/// derivation itself happens in the identity layer, outside this core.
pub async fn require_identity(mut request: Request<Body>, next: Next) -> Response {
    match extract_user(request.headers()) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorEnvelope {
                error: ErrorPayload {
                    code: "UNAUTHENTICATED".to_string(),
                    message: "missing or malformed caller identity".to_string(),
                    details: None,
                },
            }),
        )
            .into_response(),
    }
}

fn extract_user(headers: &HeaderMap) -> Option<AuthUser> {
    let user_id = headers
        .get("X-User-Id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let role = headers
        .get("X-User-Role")
        .and_then(|h| h.to_str().ok())
        .and_then(Role::parse)?;
    Some(AuthUser { user_id, role })
}
