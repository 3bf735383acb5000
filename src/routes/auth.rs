use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpResponse, web};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthUser, TOKEN_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    data: web::Data<AppState>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password required".to_string(),
        ));
    }

    let Some(user) = data
        .users
        .verify(&credentials.username, &credentials.password)
    else {
        warn!("Failed login for {}", credentials.username);
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let token = data.tokens.issue(&user).map_err(ApiError::Internal)?;
    let max_age = i64::try_from(data.tokens.ttl().as_secs()).unwrap_or(i64::MAX);
    let cookie = Cookie::build(TOKEN_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .finish();

    info!("User {} logged in", user.username);
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "success": true,
        "user": user,
        "token": token,
    })))
}

pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true, "message": "Logged out successfully" }))
}

pub async fn me(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": user.profile() }))
}

pub async fn list_users(
    data: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    Ok(HttpResponse::Ok().json(json!({ "users": data.users.profiles() })))
}
