//! Execution endpoint
//!
//! POST /execute
//! Runs one cell in a fresh sandbox and returns its output and figures.

use crate::error::ApiError;
use crate::AppState;
use actix_web::{post, web, HttpResponse};

/// The body is taken raw so the backend check can run before it is parsed
#[post("/execute")]
pub async fn execute_code(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let result = state.service.execute_payload(&body).await?;
    Ok(HttpResponse::Ok().json(result))
}
