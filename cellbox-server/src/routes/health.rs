//! Health check endpoint

use crate::AppState;
use actix_web::{get, web, HttpResponse, Responder};

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "docker": state.service.preflight().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
