pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod game;
pub mod session;
pub mod stats;

pub use config::Config;
pub use error::{AuthError, PolicyError, SessionError, SessionResult, StatsError};
