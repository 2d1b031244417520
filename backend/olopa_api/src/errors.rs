//! Application-wide error types and their HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use olopa_deal::ValidationErrors;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Deal(#[from] olopa_deal::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use olopa_deal::Error as DealError;

        match self {
            Self::Deal(DealError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Deal(DealError::Unauthorized { .. }) => StatusCode::FORBIDDEN,
            Self::Deal(DealError::DealNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Deal(
                DealError::AlreadySigned { .. }
                | DealError::InvalidState { .. }
                | DealError::DeadlineNotReached { .. }
                | DealError::TermsMismatch { .. },
            ) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let fields = match &self {
            Self::Deal(olopa_deal::Error::Validation(errors)) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            fields,
        };
        (self.status(), Json(body)).into_response()
    }
}
