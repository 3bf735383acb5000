use actix_web::{error, web};

use crate::error::ApiError;

pub mod auth;
pub mod streams;
pub mod system;

/// Mounts every route. Stream routes authenticate through the `AuthUser` extractor.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::Error::from(ApiError::BadRequest(message))
    }))
    .route("/", web::get().to(system::index))
    .route("/health", web::get().to(system::health_check))
    .route("/metrics", web::get().to(system::service_metrics))
    .service(
        web::scope("/api/auth")
            .route("/login", web::post().to(auth::login))
            .route("/logout", web::post().to(auth::logout))
            .route("/me", web::get().to(auth::me))
            .route("/users", web::get().to(auth::list_users)),
    )
    .service(
        web::scope("/api/streams")
            .route("", web::get().to(streams::list_streams))
            .route("/", web::get().to(streams::list_streams))
            .route("/{id}", web::get().to(streams::get_stream))
            .route("/{id}/status", web::post().to(streams::report_status))
            .route("/{id}/reset", web::post().to(streams::reset_stream))
            .route("/{id}/analytics", web::get().to(streams::stream_analytics)),
    );
}
