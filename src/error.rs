use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid or inactive issuer: {0}")]
    InvalidIssuer(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Subscription plan code exists: {0}")]
    PlanCodeExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::InvalidIssuer(email) => {
                log::warn!("Invalid or inactive issuer: {email}");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "INVALID_ISSUER",
                    "Invalid or inactive issuer email".to_string(),
                )
            }
            AppError::PlanNotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "PLAN_NOT_FOUND",
                msg.clone(),
            ),
            AppError::Unauthorized => {
                log::warn!("Non-admin access to catalog mutation");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "UNAUTHORIZED",
                    "Unauthorized access".to_string(),
                )
            }
            AppError::PlanCodeExists(code) => (
                actix_web::http::StatusCode::CONFLICT,
                "PLAN_CODE_EXISTS",
                format!("Subscription plan code {code} exists"),
            ),
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
