use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::auth::Role;
use crate::models::StreamInfo;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl: default_token_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub attempts: u32,
    pub max_concurrent: usize,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            attempts: 3,
            max_concurrent: 8,
            user_agent: format!("feedwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSettings {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
    #[serde(default)]
    pub users: Vec<UserSettings>,
}

impl Settings {
    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            anyhow::bail!("auth.jwt_secret must be set (APP__AUTH__JWT_SECRET)");
        }
        if self.probe.attempts == 0 {
            anyhow::bail!("probe.attempts must be greater than 0");
        }
        if self.probe.max_concurrent == 0 {
            anyhow::bail!("probe.max_concurrent must be greater than 0");
        }

        let mut ids = HashSet::new();
        for stream in &self.streams {
            if stream.id.trim().is_empty() {
                anyhow::bail!("stream '{}' has an empty id", stream.name);
            }
            if !ids.insert(stream.id.as_str()) {
                anyhow::bail!("duplicate stream id: {}", stream.id);
            }
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            if !usernames.insert(user.username.as_str()) {
                anyhow::bail!("duplicate username: {}", user.username);
            }
        }
        Ok(())
    }
}

/// Reads `path` (extension optional, file optional) then `APP__*` environment variables.
pub fn load_settings(path: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}
