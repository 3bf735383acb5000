//! Availability tracking for CCTV feeds
//!
//! Keeps an in-memory availability record per feed, advanced by online/offline
//! reports, and serves it over an authenticated JSON API.

pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod probe;
pub mod registry;
pub mod routes;
pub mod state;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use error::{ApiError, RegistryError};
pub use registry::StreamRegistry;
pub use state::AppState;
