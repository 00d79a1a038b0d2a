use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

/// Error kinds surfaced to clients. Every handler maps internal failures
/// into one of these rather than leaking implementation details.
#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BusinessRule(String),
    Internal(String),
}

impl AppError {
    pub fn reason(&self) -> &str {
        match self {
            AppError::InvalidInput(s)
            | AppError::Unauthorized(s)
            | AppError::Forbidden(s)
            | AppError::NotFound(s)
            | AppError::BusinessRule(s)
            | AppError::Internal(s) => s,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

impl std::error::Error for AppError {}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.reason().to_string(),
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;
