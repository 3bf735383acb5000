use std::sync::Arc;
use std::time::Instant;

use crate::auth::{TokenIssuer, UserStore};
use crate::registry::StreamRegistry;

// App state
pub struct AppState {
    pub registry: Arc<StreamRegistry>,
    pub users: UserStore,
    pub tokens: TokenIssuer,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: Arc<StreamRegistry>, users: UserStore, tokens: TokenIssuer) -> Self {
        Self {
            registry,
            users,
            tokens,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server started.
    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
