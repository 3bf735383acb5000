use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde_json::json;

use crate::models::Status;
use crate::state::AppState;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "CCTV availability API",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "auth": "/api/auth/*",
            "streams": "/api/streams/*",
        }
    }))
}

// Health check endpoint
pub async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "uptime": data.uptime(),
    }))
}

pub async fn service_metrics(data: web::Data<AppState>) -> HttpResponse {
    let streams = data.registry.list();
    let online = streams
        .iter()
        .filter(|s| s.record.status == Status::Online)
        .count();

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "CCTV availability API",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": data.uptime(),
        "streams": streams.len(),
        "online": online,
        "offline": streams.len() - online,
        "timestamp": Utc::now(),
    }))
}
