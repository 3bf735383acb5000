use actix_web::{HttpResponse, web};
use log::info;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Left to the registry to validate, after the stream id.
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "reason")]
    pub error_message: Option<String>,
}

pub async fn list_streams(
    data: web::Data<AppState>,
    _user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let streams = data.registry.list();
    Ok(HttpResponse::Ok().json(streams))
}

pub async fn get_stream(
    data: web::Data<AppState>,
    _user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let stream = data.registry.get(&id)?;
    Ok(HttpResponse::Ok().json(stream))
}

// Report a feed going online/offline
pub async fn report_status(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<String>,
    report: web::Json<StatusReport>,
) -> Result<HttpResponse, ApiError> {
    user.require_stream_management()?;
    let report = report.into_inner();
    let stream = data
        .registry
        .report_status(&id, &report.status, report.error_message)?;
    Ok(HttpResponse::Ok().json(stream))
}

pub async fn reset_stream(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    user.require_stream_management()?;
    info!("User {} resetting statistics of stream {}", user.0.sub, id);
    let stream = data.registry.reset(&id)?;
    Ok(HttpResponse::Ok().json(stream))
}

pub async fn stream_analytics(
    data: web::Data<AppState>,
    _user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let analytics = data.registry.analytics(&id)?;
    Ok(HttpResponse::Ok().json(analytics))
}
