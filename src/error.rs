use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Ineligible(String),
    #[error("{0}")]
    BelowMinimum(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Gateway(String),
    #[error("{0}")]
    GatewayTimeout(String),
    #[error("invalid webhook signature")]
    SignatureInvalid,
    #[error("{0}")]
    Inconsistent(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::InvalidState(_) => "INVALID_STATE",
            DomainError::Ineligible(_) => "INELIGIBLE",
            DomainError::BelowMinimum(_) => "BELOW_MINIMUM",
            DomainError::Unauthorized(_) => "UNAUTHORIZED",
            DomainError::Gateway(_) => "GATEWAY_ERROR",
            DomainError::GatewayTimeout(_) => "GATEWAY_TIMEOUT",
            DomainError::SignatureInvalid => "SIGNATURE_INVALID",
            DomainError::Inconsistent(_) => "INCONSISTENT_STATE",
            DomainError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidState(_)
            | DomainError::Ineligible(_)
            | DomainError::BelowMinimum(_)
            | DomainError::SignatureInvalid => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
            DomainError::Gateway(_) => StatusCode::BAD_GATEWAY,
            DomainError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DomainError::Inconsistent(_) => StatusCode::CONFLICT,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_envelope(self) -> (StatusCode, ErrorEnvelope) {
        let status = self.status_code();
        let message = match &self {
            // internal details stay out of client responses
            DomainError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            ErrorEnvelope {
                error: ErrorPayload {
                    code: self.code().to_string(),
                    message,
                    details: None,
                },
            },
        )
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_envelope();
        (status, Json(body)).into_response()
    }
}
