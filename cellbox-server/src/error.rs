//! Error mapping for the HTTP surface

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cellbox_sandbox::{ErrorClass, ExecuteError, ExecutionResult};
use thiserror::Error;

/// Request-level rejection rendered as a result envelope with `error` set
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ExecuteError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.class() {
            ErrorClass::Client => StatusCode::BAD_REQUEST,
            ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Some(source) = std::error::Error::source(&self.0) {
            tracing::warn!(error = %self.0, cause = %source, "Request rejected");
        } else {
            tracing::warn!(error = %self.0, "Request rejected");
        }
        HttpResponse::build(self.status_code()).json(ExecutionResult::rejected(self.0.to_string()))
    }
}
