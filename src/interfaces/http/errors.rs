use crate::domain::error::AppError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    fn message(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
        }
    }
}

impl AppError {
    fn body(&self) -> ErrorBody {
        match self {
            AppError::ValidationError(msg)
            | AppError::ConfigError(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg) => ErrorBody::message(msg),
            AppError::UpstreamError {
                service, details, ..
            } => ErrorBody {
                error: format!("{} Error", service),
                details: (!details.is_empty()).then(|| details.clone()),
            },
            other => ErrorBody {
                error: "Internal Server Error".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamError { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
