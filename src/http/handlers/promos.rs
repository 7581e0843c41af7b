use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::auth::AuthUser;
use crate::domain::promo::{NewPromoCode, PromoCodeUpdate};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub subtotal: f64,
    pub course_id: Option<Uuid>,
}

/// Public pricing preview; no authentication, no usage counting.
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(req): Json<ValidatePromoRequest>,
) -> impl IntoResponse {
    match state
        .promo_service
        .validate(&req.code, req.subtotal, req.course_id)
        .await
    {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_promo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(data): Json<NewPromoCode>,
) -> impl IntoResponse {
    match state.promo_service.create(&user, data).await {
        Ok(promo) => (StatusCode::CREATED, Json(promo)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_active_promos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match state.promo_service.list_active(&user).await {
        Ok(promos) => (StatusCode::OK, Json(promos)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_all_promos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match state.promo_service.list_all(&user).await {
        Ok(promos) => (StatusCode::OK, Json(promos)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_promo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(promo_code_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.promo_service.get(&user, promo_code_id).await {
        Ok(promo) => (StatusCode::OK, Json(promo)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_promos_for_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.promo_service.list_for_course(&user, course_id).await {
        Ok(promos) => (StatusCode::OK, Json(promos)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_promo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(promo_code_id): Path<Uuid>,
    Json(changes): Json<PromoCodeUpdate>,
) -> impl IntoResponse {
    match state.promo_service.update(&user, promo_code_id, changes).await {
        Ok(promo) => (StatusCode::OK, Json(promo)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn deactivate_promo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(promo_code_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.promo_service.deactivate(&user, promo_code_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_promo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(promo_code_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.promo_service.delete(&user, promo_code_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
