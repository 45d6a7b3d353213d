//! # kubebuild-server
//!
//! HTTP host for kubebuild: admission and conversion webhooks for the `App`
//! kind, a small namespaced App API, and the controller that reconciles
//! stored Apps in the background.

pub mod apps;
pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod state;
pub mod webhook;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{KubebuildServer, ServerBuilder, build_app};
pub use state::AppState;
