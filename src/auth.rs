//! Dashboard users, password checks and session tokens

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use anyhow::{Result, anyhow};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::UserSettings;
use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    User,
    Viewer,
}

impl Role {
    /// Whether this role may report feed status and reset statistics.
    pub fn can_manage_streams(&self) -> bool {
        matches!(self, Role::Admin | Role::Operator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::User => "user",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// Public view of a configured user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub role: Role,
}

struct StoredUser {
    profile: UserProfile,
    password_hash: String,
}

/// Configured users, with passwords kept only as Argon2 hashes.
pub struct UserStore {
    users: HashMap<String, StoredUser>,
}

impl UserStore {
    pub fn from_settings(users: &[UserSettings]) -> Result<Self> {
        let argon2 = Argon2::default();
        let mut stored = HashMap::with_capacity(users.len());
        for user in users {
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = argon2
                .hash_password(user.password.as_bytes(), &salt)
                .map_err(|e| anyhow!("failed to hash password for {}: {}", user.username, e))?
                .to_string();
            stored.insert(
                user.username.clone(),
                StoredUser {
                    profile: UserProfile {
                        username: user.username.clone(),
                        name: user.name.clone(),
                        role: user.role,
                    },
                    password_hash,
                },
            );
        }
        Ok(Self { users: stored })
    }

    /// Returns the user's profile when `password` matches.
    pub fn verify(&self, username: &str, password: &str) -> Option<UserProfile> {
        let user = self.users.get(username)?;
        let parsed = PasswordHash::new(&user.password_hash).ok()?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()
            .map(|_| user.profile.clone())
    }

    /// All users sorted by username.
    pub fn profiles(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self.users.values().map(|u| u.profile.clone()).collect();
        profiles.sort_by(|a, b| a.username.cmp(&b.username));
        profiles
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 session tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &UserProfile) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            role: user.role,
            name: user.name.clone(),
            iat: now,
            exp: now + i64::try_from(self.ttl.as_secs())?,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding, &Validation::default())?.claims)
    }
}

/// The caller of an authenticated route, taken from the `token` cookie or a bearer header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.0.sub.clone(),
            name: self.0.name.clone(),
            role: self.0.role,
        }
    }

    pub fn require_stream_management(&self) -> Result<(), ApiError> {
        if self.0.role.can_manage_streams() {
            Ok(())
        } else {
            warn!("User {} ({}) denied stream management", self.0.sub, self.0.role);
            Err(ApiError::Forbidden(
                "Operator or admin access required".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

fn token_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal(anyhow!("application state is not configured")))?;
    let token = token_from_request(req)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    state.tokens.validate(&token).map(AuthUser).map_err(|e| {
        warn!("Rejected token for {}: {}", req.path(), e);
        ApiError::Unauthorized("Invalid token".to_string())
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
