//! Pieces shared by the Lambda entry points: configuration, application
//! state, authentication and per-visitor dashboard sessions.

pub mod auth;
pub mod config;
pub mod sessions;
pub mod state;

pub use config::{AppConfig, CognitoSettings, StoreBackend};
pub use state::AppState;
